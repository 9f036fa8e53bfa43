// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Transport};
use crate::api::{Reference, Unpacker};

use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

/// Pulls an image from a registry and unpacks its files
#[derive(StructOpt, Debug)]
pub struct Pull {
    /// The image name (format: [source]name[:tag|@digest])
    name: String,

    /// The output directory (created if missing)
    #[structopt(short, long, default_value = ".")]
    output: PathBuf,

    /// Trust the layer blobs without re-hashing them
    #[structopt(long)]
    no_verify: bool,

    /// Don't display the progress bar
    #[structopt(short, long)]
    quiet: bool,

    #[structopt(flatten)]
    transport: Transport,
}

impl Command for Pull {
    fn execute(self) -> Result<()> {
        let reference = Reference::new(&self.name)?;
        let unpacker = Unpacker::new()
            .verify(!self.no_verify)
            .progress(!self.quiet);

        unpacker.pull(&reference, &self.transport.skopeo(), &self.output)?;
        Ok(())
    }
}
