// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::Command;
use crate::api::Unpacker;

use std::path::PathBuf;

use anyhow::Result;
use log::info;
use structopt::StructOpt;

/// Unpacks the files of a local image layout into the given directory
#[derive(StructOpt, Debug)]
pub struct Unpack {
    /// The layout directory (manifest.json plus blobs)
    layout: PathBuf,

    /// The output directory (created if missing)
    #[structopt(default_value = ".")]
    output: PathBuf,

    /// Trust the layer blobs without re-hashing them
    #[structopt(long)]
    no_verify: bool,

    /// Don't display the progress bar
    #[structopt(short, long)]
    quiet: bool,
}

impl Command for Unpack {
    fn execute(self) -> Result<()> {
        let unpacker = Unpacker::new()
            .verify(!self.no_verify)
            .progress(!self.quiet);

        let report = unpacker.unpack(&self.layout, &self.output)?;
        info!(
            "extracted {} layer(s) into {:?}",
            report.extracted.len(),
            self.output
        );

        for digest in report.skipped {
            eprintln!("skipped missing layer {}", digest);
        }

        Ok(())
    }
}
