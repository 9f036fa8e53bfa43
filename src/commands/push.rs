// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Transport};
use crate::api::{Image, Reference};

use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

/// Packs files into a single-layer image and pushes it to a registry
#[derive(StructOpt, Debug)]
pub struct Push {
    /// The image name (format: [source]name[:tag|@digest])
    name: String,

    /// The files to ship, relative to the current directory
    #[structopt(required = true)]
    files: Vec<PathBuf>,

    /// Normalize timestamps and ownership so equal inputs give equal images
    #[structopt(long)]
    reproducible: bool,

    /// Don't display the progress bar
    #[structopt(short, long)]
    quiet: bool,

    #[structopt(flatten)]
    transport: Transport,
}

impl Command for Push {
    fn execute(self) -> Result<()> {
        let reference = Reference::new(&self.name)?;
        let base = std::env::current_dir().context("unable to find the current directory")?;

        let image = Image::new(base)
            .reproducible(self.reproducible)
            .progress(!self.quiet);

        let id = image.push(&self.files, &reference, &self.transport.skopeo())?;
        println!("{}", id);
        Ok(())
    }
}
