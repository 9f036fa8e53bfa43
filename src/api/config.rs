// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::Blob;
use crate::formats::{docker::image::Config, Digest};

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{TimeZone, Utc};

/// The `created_by` label recorded in the image history
pub const CREATOR: &str = "parcel";

fn render(secs: i64) -> Result<String> {
    let time = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| anyhow!("timestamp out of range: {}", secs))?;

    Ok(time.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string())
}

/// The creation time to record in a new image
///
/// Normally the current time truncated to whole seconds. Reproducible builds
/// use `SOURCE_DATE_EPOCH` when set and the Unix epoch otherwise.
pub fn created(reproducible: bool) -> Result<String> {
    if !reproducible {
        return render(Utc::now().timestamp());
    }

    match std::env::var("SOURCE_DATE_EPOCH") {
        Ok(value) => {
            let secs = value
                .trim()
                .parse()
                .with_context(|| format!("invalid SOURCE_DATE_EPOCH: {:?}", value))?;
            render(secs)
        }
        Err(..) => render(0),
    }
}

/// Writes the image configuration blob for a single layer into `dir`
pub fn build(layer: Digest, created: &str, dir: &Path) -> Result<Blob> {
    let config = Config::new(created.into(), CREATOR, layer);
    let bytes = serde_json::to_vec(&config)?;
    Blob::create(dir, |w| Ok(w.write_all(&bytes)?))
}

#[cfg(test)]
mod test {
    use super::{build, render, CREATOR};
    use crate::formats::{docker::image::Config, Digest};

    #[test]
    fn timestamps() {
        assert_eq!(render(0).unwrap(), "1970-01-01T00:00:00.000000000Z");
        assert_eq!(render(1_635_933_600).unwrap(), "2021-11-03T10:00:00.000000000Z");
        assert!(render(i64::MAX).is_err());
    }

    #[test]
    fn blob() {
        let dir = tempfile::tempdir().unwrap();
        let layer = Digest::of(b"layer");
        let created = render(0).unwrap();

        let blob = build(layer, &created, dir.path()).unwrap();
        let bytes = std::fs::read(&blob.path).unwrap();
        assert_eq!(blob.digest, Digest::of(&bytes));
        assert_eq!(blob.size, bytes.len() as u64);
        assert_eq!(blob.path, dir.path().join(blob.digest.hex()));

        // Compact output: no whitespace anywhere in the document.
        assert!(!bytes.iter().any(|b| b.is_ascii_whitespace()));

        let config: Config = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(config.rootfs.diff_ids, vec![layer]);
        assert_eq!(config.history.len(), 1);
        assert_eq!(config.history[0].created, created);
        assert_eq!(config.history[0].created_by, CREATOR);
        assert_eq!(config.architecture, "amd64");
        assert_eq!(config.os, "linux");
    }
}
