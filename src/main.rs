// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

mod api;
mod commands;
mod formats;
mod iotools;

use api::TransferError;
use commands::Command;

use log::error;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

fn logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Registry failures exit with the transfer program's own status
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<TransferError>() {
        Some(TransferError::Status(code)) => *code,
        _ => 1,
    }
}

fn main() {
    let main = commands::Main::from_args();
    logging(main.verbosity());

    if let Err(e) = main.execute() {
        error!("{:#}", e);
        std::process::exit(exit_code(&e));
    }
}

#[cfg(test)]
mod test {
    use super::exit_code;
    use crate::api::TransferError;

    use std::io::{Error, ErrorKind};
    use std::path::PathBuf;

    use anyhow::{anyhow, Context};

    #[test]
    fn transfer_status() {
        let result: anyhow::Result<()> = Err(TransferError::Status(42).into());
        let err = result.context("push failed").unwrap_err();
        assert_eq!(exit_code(&err), 42);
    }

    #[test]
    fn other_failures() {
        let spawn = TransferError::Spawn(PathBuf::from("skopeo"), Error::from(ErrorKind::NotFound));
        assert_eq!(exit_code(&spawn.into()), 1);
        assert_eq!(exit_code(&anyhow!("bad input")), 1);
    }
}
