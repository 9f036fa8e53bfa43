// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::Blob;
use crate::formats::docker::v2::{Descriptor, Manifest, CONFIG_MEDIA_TYPE, LAYER_MEDIA_TYPE};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// The name of the manifest file inside an image layout
pub const MANIFEST: &str = "manifest.json";

/// Writes `manifest.json` referencing the config and layer blobs into `dir`
pub fn build(config: &Blob, layer: &Blob, dir: &Path) -> Result<PathBuf> {
    let manifest = Manifest::new(
        Descriptor::new(CONFIG_MEDIA_TYPE, config.size, config.digest),
        Descriptor::new(LAYER_MEDIA_TYPE, layer.size, layer.digest),
    );

    let path = dir.join(MANIFEST);
    let bytes = serde_json::to_vec(&manifest)?;
    std::fs::write(&path, &bytes).with_context(|| format!("unable to write {:?}", path))?;

    debug!("wrote manifest {:?}", path);
    Ok(path)
}
