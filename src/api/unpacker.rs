// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::manifest::MANIFEST;
use super::scratch::with_scratch;
use super::{progress_bar, Direction, Reference, Transfer};
use crate::formats::docker::v2::{Descriptor, Manifest, LAYER_MEDIA_TYPE};
use crate::formats::Digest;

use std::fs::{self, DirBuilder, File, OpenOptions, Permissions};
use std::io::{BufReader, ErrorKind, Read};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use tar::{Archive, Entry, EntryType};

const GZIP_LAYERS: &[&str] = &[
    LAYER_MEDIA_TYPE,
    "application/vnd.oci.image.layer.v1.tar+gzip",
    "application/vnd.oci.image.layer.nondistributable.v1.tar+gzip",
];

/// Problems with an image layout found while unpacking it
#[derive(Debug)]
pub enum LayoutError {
    MissingManifest(PathBuf),
    BadManifest(PathBuf, String),
    Unsupported(String),
    Integrity(Digest, String),
    Unsafe(PathBuf),
}

impl std::error::Error for LayoutError {}
impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::MissingManifest(p) => write!(f, "manifest not found: {:?}", p),
            LayoutError::BadManifest(p, e) => write!(f, "invalid manifest {:?}: {}", p, e),
            LayoutError::Unsupported(t) => write!(f, "unsupported layer type: {:?}", t),
            LayoutError::Integrity(d, e) => write!(f, "layer {} failed verification: {}", d, e),
            LayoutError::Unsafe(p) => write!(f, "disallowed path in layer: {:?}", p),
        }
    }
}

/// What happened to each layer of an unpacked image
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub extracted: Vec<Digest>,
    pub skipped: Vec<Digest>,
}

/// Extracts the layers of an image layout into a directory
#[derive(Clone, Debug)]
pub struct Unpacker {
    verify: bool,
    progress: bool,
}

impl Default for Unpacker {
    fn default() -> Self {
        Self {
            verify: true,
            progress: false,
        }
    }
}

impl Unpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-hash each layer blob against its descriptor before extracting it
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Reads and checks the manifest of the layout in `layout`
    pub fn manifest(layout: &Path) -> Result<Manifest> {
        let path = layout.join(MANIFEST);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LayoutError::MissingManifest(path).into())
            }
            Err(e) => return Err(e).with_context(|| format!("unable to read {:?}", path)),
        };

        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| LayoutError::BadManifest(path.clone(), e.to_string()))?;

        if manifest.schema_version != Manifest::SCHEMA_VERSION {
            let msg = format!("unsupported schemaVersion {}", manifest.schema_version);
            return Err(LayoutError::BadManifest(path, msg).into());
        }

        for layer in &manifest.layers {
            if !GZIP_LAYERS.contains(&layer.media_type.as_str()) {
                return Err(LayoutError::Unsupported(layer.media_type.clone()).into());
            }
        }

        Ok(manifest)
    }

    fn check(layer: &Descriptor, blob: &Path) -> Result<()> {
        let file = File::open(blob).with_context(|| format!("unable to read {:?}", blob))?;
        let (digest, size) = Digest::compute(BufReader::new(file))
            .with_context(|| format!("unable to read {:?}", blob))?;

        if size != layer.size {
            let msg = format!("expected {} bytes, found {}", layer.size, size);
            return Err(LayoutError::Integrity(layer.digest, msg).into());
        }

        if digest != layer.digest {
            let msg = format!("content hashes to {}", digest);
            return Err(LayoutError::Integrity(layer.digest, msg).into());
        }

        Ok(())
    }

    /// Extracts every layer present in `layout` into `target`, in order
    ///
    /// Layers whose blob is missing from the layout are skipped.
    pub fn unpack(&self, layout: &Path, target: &Path) -> Result<Report> {
        let manifest = Self::manifest(layout)?;
        fs::create_dir_all(target).with_context(|| format!("unable to create {:?}", target))?;

        let mut report = Report::default();
        let mut present = Vec::new();
        for layer in &manifest.layers {
            let blob = layout.join(layer.digest.hex());
            if blob.is_file() {
                present.push((layer, blob));
            } else {
                warn!("skipping missing layer {}", layer.digest);
                report.skipped.push(layer.digest);
            }
        }

        let total = present.iter().map(|(layer, _)| layer.size).sum();
        let progress = progress_bar("unpack", total, self.progress);

        for (layer, blob) in present {
            if self.verify {
                Self::check(layer, &blob)?;
            }

            let file = File::open(&blob).with_context(|| format!("unable to read {:?}", blob))?;
            let src = progress.wrap_read(BufReader::new(file));
            let mut archive = Archive::new(GzDecoder::new(src));

            let entries = archive
                .entries()
                .with_context(|| format!("unable to read layer {}", layer.digest))?;

            for entry in entries {
                let mut entry =
                    entry.with_context(|| format!("unable to read layer {}", layer.digest))?;
                place(&mut entry, target)?;
            }

            info!("extracted layer {}", layer.digest);
            report.extracted.push(layer.digest);
        }

        progress.finish_and_clear();
        Ok(report)
    }

    /// Fetches `reference` into a scratch layout and unpacks it into `target`
    pub fn pull(
        &self,
        reference: &Reference,
        transfer: &dyn Transfer,
        target: &Path,
    ) -> Result<Report> {
        with_scratch(|dir| {
            transfer.transfer(dir, reference, Direction::Pull)?;
            self.unpack(dir, target)
        })
    }
}

/// Rejects archive paths that could land outside the target directory
fn validate(path: &Path) -> Result<()> {
    for component in path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(..) => {
                return Err(LayoutError::Unsafe(path.into()).into());
            }

            _ => continue,
        }
    }

    Ok(())
}

/// Refuses to write through symlinks below the target directory
fn guard(target: &Path, path: &Path) -> Result<()> {
    let mut current = target.to_path_buf();

    if let Some(parent) = path.parent() {
        for component in parent.components() {
            current.push(component);
            if let Ok(meta) = fs::symlink_metadata(&current) {
                if meta.file_type().is_symlink() {
                    return Err(LayoutError::Unsafe(path.into()).into());
                }
            }
        }
    }

    Ok(())
}

/// Removes a non-directory entry that is in the way of a new one
fn clear(into: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(into) {
        if !meta.is_dir() {
            fs::remove_file(into).with_context(|| format!("unable to replace {:?}", into))?;
        }
    }

    Ok(())
}

fn place<R: Read>(entry: &mut Entry<R>, target: &Path) -> Result<()> {
    let path = entry.path()?.into_owned();
    let head = entry.header().clone();

    validate(&path)?;
    guard(target, &path)?;

    // Append the path to our output directory.
    let into = target.join(&path);
    let perm = head.mode()? & !(libc::S_IFMT as u32);

    if let Some(parent) = into.parent() {
        fs::create_dir_all(parent).with_context(|| format!("unable to create {:?}", parent))?;
    }

    match head.entry_type() {
        EntryType::Directory => {
            DirBuilder::new()
                .mode(perm | 0o700)
                .recursive(true)
                .create(&into)
                .with_context(|| format!("unable to create {:?}", into))?;
        }

        EntryType::Regular | EntryType::Continuous => {
            clear(&into)?;
            let mut file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&into)
                .with_context(|| format!("unable to create {:?}", into))?;

            std::io::copy(entry, &mut file)?;
            file.set_permissions(Permissions::from_mode(perm))?;
        }

        EntryType::Symlink => match head.link_name()? {
            Some(from) => {
                clear(&into)?;
                std::os::unix::fs::symlink(from, &into)?;
            }

            None => return Err(LayoutError::Unsafe(path).into()),
        },

        EntryType::Link => match head.link_name()? {
            Some(from) => {
                validate(&from)?;
                guard(target, &from)?;
                clear(&into)?;
                fs::hard_link(target.join(from), &into)?;
            }

            None => return Err(LayoutError::Unsafe(path).into()),
        },

        EntryType::XGlobalHeader => debug!("ignoring global header"),

        kind => warn!("skipping unsupported entry {:?} ({:?})", path, kind),
    }

    Ok(())
}
