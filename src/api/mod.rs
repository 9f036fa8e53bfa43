// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

mod blob;
mod config;
mod image;
mod layer;
mod manifest;
mod reference;
mod scratch;
mod transfer;
mod unpacker;

pub use self::blob::Blob;
pub use self::image::Image;
pub use self::layer::Layer;
pub use self::reference::Reference;
pub use self::transfer::{Direction, Skopeo, Transfer, TransferError};
pub use self::unpacker::Unpacker;

use indicatif::{ProgressBar, ProgressStyle};

fn progress_bar(prefix: &str, total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let tmpl = "{prefix} {elapsed:>4} {wide_bar} {bytes:>12} {bytes_per_sec:>12} {eta:>4}";
    let pb = ProgressBar::new(total);
    pb.set_prefix(prefix.to_string());
    pb.set_style(ProgressStyle::default_bar().template(tmpl));
    pb
}
