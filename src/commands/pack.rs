// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::Command;
use crate::api::Image;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use structopt::StructOpt;

/// Writes a single-layer image layout into a local directory
#[derive(StructOpt, Debug)]
pub struct Pack {
    /// The layout directory (created if missing)
    output: PathBuf,

    /// The files to pack, relative to the current directory
    #[structopt(required = true)]
    files: Vec<PathBuf>,

    /// Normalize timestamps and ownership so equal inputs give equal images
    #[structopt(long)]
    reproducible: bool,

    /// Don't display the progress bar
    #[structopt(short, long)]
    quiet: bool,
}

impl Command for Pack {
    fn execute(self) -> Result<()> {
        let base = std::env::current_dir().context("unable to find the current directory")?;
        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("unable to create {:?}", self.output))?;

        let image = Image::new(base)
            .reproducible(self.reproducible)
            .progress(!self.quiet);

        let assembled = image.assemble(&self.files, &self.output)?;
        info!(
            "wrote {:?} with layer {}",
            assembled.manifest, assembled.layer.digest
        );

        println!("{}", assembled.config.digest);
        Ok(())
    }
}
