// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::Reference;

use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use log::{debug, info};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Copy the local layout to the registry
    Push,

    /// Copy the registry image into the (empty) local layout
    Pull,
}

/// Moves an image layout between a local directory and a registry
pub trait Transfer {
    fn transfer(&self, layout: &Path, reference: &Reference, direction: Direction) -> Result<()>;
}

#[derive(Debug)]
pub enum TransferError {
    Spawn(PathBuf, std::io::Error),
    Status(i32),
}

impl std::error::Error for TransferError {}
impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::Spawn(p, e) => write!(f, "unable to run {:?}: {}", p, e),
            TransferError::Status(c) => write!(f, "transfer failed with status {}", c),
        }
    }
}

/// Transfers images by running `skopeo copy`
#[derive(Clone, Debug)]
pub struct Skopeo {
    program: PathBuf,
    args: Vec<String>,
}

impl Default for Skopeo {
    fn default() -> Self {
        Self::new("skopeo")
    }
}

impl Skopeo {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra `copy` options placed before the source and destination
    pub fn args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    fn command(&self, layout: &Path, reference: &Reference, direction: Direction) -> Command {
        let mut local = OsString::from("dir:");
        local.push(layout);
        let remote = OsString::from(reference.transport());

        let (src, dst) = match direction {
            Direction::Push => (local, remote),
            Direction::Pull => (remote, local),
        };

        let mut cmd = Command::new(&self.program);
        cmd.arg("copy").args(&self.args).arg(src).arg(dst);
        cmd
    }
}

impl Transfer for Skopeo {
    fn transfer(&self, layout: &Path, reference: &Reference, direction: Direction) -> Result<()> {
        let mut cmd = self.command(layout, reference, direction);
        debug!("running {:?}", cmd);

        let status = cmd
            .status()
            .map_err(|e| TransferError::Spawn(self.program.clone(), e))?;

        match (status.code(), status.signal()) {
            (Some(0), ..) => {
                info!("{:?} {} complete", direction, reference);
                Ok(())
            }
            (Some(code), ..) => Err(TransferError::Status(code).into()),
            (None, Some(signal)) => Err(TransferError::Status(128 + signal).into()),
            (None, None) => Err(TransferError::Status(1).into()),
        }
    }
}

/// An in-memory registry for exercising push and pull without a network
#[cfg(test)]
pub(crate) mod fake {
    use super::{Direction, Reference, Transfer, TransferError};

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use anyhow::Result;

    #[derive(Default)]
    pub(crate) struct Registry {
        pub images: RefCell<HashMap<String, Vec<(String, Vec<u8>)>>>,
        pub layouts: RefCell<Vec<PathBuf>>,
        pub status: Option<i32>,
    }

    impl Transfer for Registry {
        fn transfer(&self, layout: &Path, reference: &Reference, dir: Direction) -> Result<()> {
            self.layouts.borrow_mut().push(layout.to_owned());

            if let Some(code) = self.status {
                return Err(TransferError::Status(code).into());
            }

            match dir {
                Direction::Push => {
                    let mut files = Vec::new();
                    for entry in std::fs::read_dir(layout)? {
                        let entry = entry?;
                        let name = entry.file_name().to_string_lossy().into_owned();
                        files.push((name, std::fs::read(entry.path())?));
                    }

                    let mut images = self.images.borrow_mut();
                    images.insert(reference.to_string(), files);
                }

                Direction::Pull => {
                    let images = self.images.borrow();
                    let files = images
                        .get(&reference.to_string())
                        .ok_or(TransferError::Status(1))?;

                    for (name, data) in files {
                        std::fs::write(layout.join(name), data)?;
                    }
                }
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, Skopeo, Transfer, TransferError};
    use crate::api::Reference;

    use std::path::Path;

    fn reference() -> Reference {
        "localhost:5000/files:v1".parse().unwrap()
    }

    #[test]
    fn arguments() {
        let skopeo = Skopeo::default().args(vec!["--dest-tls-verify=false".to_string()]);

        let push = skopeo.command(Path::new("/tmp/layout"), &reference(), Direction::Push);
        let args: Vec<_> = push.get_args().collect();
        assert_eq!(push.get_program(), "skopeo");
        assert_eq!(
            args,
            [
                "copy",
                "--dest-tls-verify=false",
                "dir:/tmp/layout",
                "docker://localhost:5000/files:v1"
            ]
        );

        let pull = skopeo.command(Path::new("/tmp/layout"), &reference(), Direction::Pull);
        let args: Vec<_> = pull.get_args().collect();
        assert_eq!(args[2], "docker://localhost:5000/files:v1");
        assert_eq!(args[3], "dir:/tmp/layout");
    }

    #[test]
    fn success() {
        let skopeo = Skopeo::new("true");
        skopeo
            .transfer(Path::new("."), &reference(), Direction::Push)
            .unwrap();
    }

    #[test]
    fn status_propagates() {
        let skopeo = Skopeo::new("false");
        let err = skopeo
            .transfer(Path::new("."), &reference(), Direction::Pull)
            .unwrap_err();

        match err.downcast_ref::<TransferError>() {
            Some(TransferError::Status(1)) => (),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_program() {
        let skopeo = Skopeo::new("/nonexistent/skopeo");
        let err = skopeo
            .transfer(Path::new("."), &reference(), Direction::Push)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::Spawn(..))
        ));
    }
}
