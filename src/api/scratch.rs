// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::TempDir;

/// A private temporary directory owned by a single push or pull
///
/// Call `release()` to remove it and learn about removal failures. A scratch
/// directory that is dropped without being released is still removed.
#[derive(Debug)]
pub struct Scratch(TempDir);

impl Scratch {
    const PREFIX: &'static str = "parcel-";

    pub fn acquire() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir()
            .context("unable to create scratch directory")?;

        debug!("acquired scratch directory {:?}", dir.path());
        Ok(Self(dir))
    }

    pub fn path(&self) -> &Path {
        self.0.path()
    }

    pub fn release(self) -> Result<()> {
        let path = self.0.path().to_owned();
        self.0
            .close()
            .with_context(|| format!("unable to remove scratch directory {:?}", path))?;

        debug!("released scratch directory {:?}", path);
        Ok(())
    }
}

/// Runs `op` inside a fresh scratch directory, releasing it on every path
///
/// An error from `op` wins over an error releasing the directory.
pub fn with_scratch<T, F>(op: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let scratch = Scratch::acquire()?;
    let result = op(scratch.path());
    let released = scratch.release();

    match (result, released) {
        (Ok(value), released) => released.map(|_| value),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(r)) => {
            warn!("{:#}", r);
            Err(e)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{with_scratch, Scratch};

    use std::path::PathBuf;

    use anyhow::anyhow;

    #[test]
    fn release() {
        let scratch = Scratch::acquire().unwrap();
        let path = scratch.path().to_owned();
        std::fs::write(path.join("file"), b"data").unwrap();
        assert!(path.is_dir());

        scratch.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes() {
        let scratch = Scratch::acquire().unwrap();
        let path = scratch.path().to_owned();
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn removed_on_error() {
        let mut seen = PathBuf::new();
        let result: anyhow::Result<()> = with_scratch(|dir| {
            seen = dir.to_owned();
            std::fs::write(dir.join("file"), b"data")?;
            Err(anyhow!("boom"))
        });

        assert_eq!(result.unwrap_err().to_string(), "boom");
        assert!(!seen.as_os_str().is_empty());
        assert!(!seen.exists());
    }

    #[test]
    fn removed_on_success() {
        let mut seen = PathBuf::new();
        let value = with_scratch(|dir| {
            seen = dir.to_owned();
            Ok(7)
        })
        .unwrap();

        assert_eq!(value, 7);
        assert!(!seen.exists());
    }
}
