// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::formats::Digest;
use crate::iotools::Tally;

use std::fs::Permissions;
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use tempfile::Builder;

/// A content-addressed file inside an image layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub digest: Digest,
    pub size: u64,
    pub path: PathBuf,
}

impl Blob {
    /// Streams a new blob into `dir`
    ///
    /// The data is written to a temporary file which is renamed to the hex
    /// digest of the written bytes once `fill` returns. If `fill` fails, the
    /// temporary file is removed and no blob is left behind.
    pub fn create<F>(dir: &Path, fill: F) -> Result<Self>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        // 0644 less the umask, like any other new file.
        let tmp = Builder::new()
            .permissions(Permissions::from_mode(0o644))
            .tempfile_in(dir)
            .with_context(|| format!("unable to create a blob in {:?}", dir))?;

        let mut tally = Tally::new(BufWriter::new(tmp.as_file()));
        fill(&mut tally)?;
        let (writer, digest, size) = tally.finish()?;
        drop(writer);

        let path = dir.join(digest.hex());
        tmp.persist(&path)
            .with_context(|| format!("unable to store blob {:?}", path))?;

        debug!("wrote blob {} ({} bytes)", digest, size);
        Ok(Self { digest, size, path })
    }
}
