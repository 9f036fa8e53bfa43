// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::formats::{Digest, Hasher};

use std::io::{Result, Write};

/// A writer which hashes and counts everything written through it
///
/// Only the bytes accepted by the inner writer are hashed, so the final digest
/// always describes exactly what landed in the inner writer.
#[derive(Debug)]
pub struct Tally<W: Write> {
    inner: W,
    hasher: Hasher,
    count: u64,
}

impl<W: Write> Tally<W> {
    #[inline]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            count: 0,
        }
    }

    /// Flushes the inner writer and returns it with the digest and length
    pub fn finish(mut self) -> Result<(W, Digest, u64)> {
        self.inner.flush()?;
        Ok((self.inner, self.hasher.finish(), self.count))
    }
}

impl<W: Write> Write for Tally<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let size = self.inner.write(buf)?;
        self.hasher.update(&buf[..size]);
        self.count += size as u64;
        Ok(size)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
