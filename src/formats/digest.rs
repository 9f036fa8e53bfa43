// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

/// Size of the chunks fed to the hasher by `Digest::compute()`
const CHUNK: usize = 64 * 1024;

#[inline(always)]
fn dehex(byte: u8) -> Result<u8, Invalid> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(Invalid::Encoding),
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Invalid {
    Algorithm,
    Encoding,
    Length,
}

impl std::error::Error for Invalid {}
impl std::fmt::Display for Invalid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invalid::Algorithm => f.write_str("invalid digest algorithm"),
            Invalid::Encoding => f.write_str("invalid digest encoding"),
            Invalid::Length => f.write_str("invalid digest length"),
        }
    }
}

/// A SHA-256 content digest
///
/// This digest is most often represented in the form 'sha256:HEX_BYTES'. When
/// naming a blob on disk only the bare hex is used (see `Digest::hex()`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    const ALGORITHM: &'static str = "sha256";

    /// Hashes a stream in fixed-size chunks
    ///
    /// Returns the digest along with the number of bytes consumed.
    pub fn compute(mut reader: impl Read) -> std::io::Result<(Self, u64)> {
        let mut hasher = Hasher::new();
        let mut buffer = vec![0; CHUNK];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            hasher.update(&buffer[..n]);
            total += n as u64;
        }

        Ok((hasher.finish(), total))
    }

    /// Hashes an in-memory buffer
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(bytes);
        hasher.finish()
    }

    pub fn algorithm(&self) -> &'static str {
        Self::ALGORITHM
    }

    /// The lowercase hex encoding without the algorithm prefix
    pub fn hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in self.0.iter() {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }
}

impl FromStr for Digest {
    type Err = Invalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let h = match s.split_once(':') {
            Some((lhs, rhs)) if lhs.eq_ignore_ascii_case(Self::ALGORITHM) => rhs,
            Some(..) => return Err(Invalid::Algorithm),
            None if s.len() == 64 => s,
            None => return Err(Invalid::Algorithm),
        };

        let mut out = [0u8; 32];
        if h.len() != out.len() * 2 {
            return Err(Invalid::Length);
        }

        for (b, pair) in out.iter_mut().zip(h.as_bytes().chunks_exact(2)) {
            *b = dehex(pair[0])? << 4 | dehex(pair[1])?;
        }

        Ok(Self(out))
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.algorithm())?;

        for byte in self.0.iter().cloned() {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Visitor;
impl<'de> serde::de::Visitor<'de> for Visitor {
    type Value = Digest;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string in the format `sha256:HASH`")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Digest::from_str(v).map_err(|e| E::custom(format!("{}: {:?}", e, v)))
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Visitor)
    }
}

/// An incremental SHA-256 hasher
///
/// A hasher implements `std::io::Write` so you can copy directly into it.
/// Writes never fail.
#[derive(Clone, Debug, Default)]
pub struct Hasher(Sha256);

impl Hasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, buf: &[u8]) {
        self.0.update(buf);
    }

    pub fn finish(self) -> Digest {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.finalize());
        Digest(out)
    }
}

impl Write for Hasher {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
