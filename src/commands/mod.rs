// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::api::Skopeo;

use std::path::PathBuf;

use structopt::StructOpt;

mod pack;
mod pull;
mod push;
mod unpack;

pub trait Command {
    fn execute(self) -> anyhow::Result<()>;
}

/// Options for the registry transfer program
#[derive(StructOpt, Debug)]
pub struct Transport {
    /// The skopeo executable used to talk to registries
    #[structopt(long, default_value = "skopeo")]
    skopeo: PathBuf,

    /// Extra option for `skopeo copy` (repeatable)
    #[structopt(long = "skopeo-arg", number_of_values = 1, allow_hyphen_values = true)]
    skopeo_args: Vec<String>,
}

impl Transport {
    fn skopeo(self) -> Skopeo {
        Skopeo::new(self.skopeo).args(self.skopeo_args)
    }
}

#[derive(StructOpt, Debug)]
pub enum Subcommand {
    Push(push::Push),
    Pull(pull::Pull),
    Pack(pack::Pack),
    Unpack(unpack::Unpack),
}

#[derive(StructOpt, Debug)]
#[structopt(about = "ship plain files through container registries")]
pub struct Main {
    /// Log more (repeat for even more)
    #[structopt(short, long, parse(from_occurrences), global = true)]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Subcommand,
}

impl Main {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

impl Command for Main {
    fn execute(self) -> anyhow::Result<()> {
        match self.cmd {
            Subcommand::Push(cmd) => cmd.execute(),
            Subcommand::Pull(cmd) => cmd.execute(),
            Subcommand::Pack(cmd) => cmd.execute(),
            Subcommand::Unpack(cmd) => cmd.execute(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Main, Subcommand};

    use structopt::StructOpt;

    #[test]
    fn parse_push() {
        let args = ["parcel", "-vv", "push", "--reproducible", "files:v1", "a", "b/c"];
        let main = Main::from_iter_safe(args).unwrap();
        assert_eq!(main.verbosity(), 2);
        assert!(matches!(main.cmd, Subcommand::Push(..)));
    }

    #[test]
    fn push_needs_files() {
        assert!(Main::from_iter_safe(["parcel", "push", "files:v1"]).is_err());
    }

    #[test]
    fn parse_pull() {
        let args = ["parcel", "pull", "--skopeo-arg=--src-tls-verify=false", "files:v1"];
        let main = Main::from_iter_safe(args).unwrap();
        assert!(matches!(main.cmd, Subcommand::Pull(..)));
    }
}
