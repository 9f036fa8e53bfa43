// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{progress_bar, Blob};

use std::fs::{self, File, Metadata};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use flate2::{write::GzEncoder, Compression};
use log::{debug, info, warn};
use tar::{Builder, Header, HeaderMode};

/// Problems with the files handed to the layer builder
#[derive(Debug)]
pub enum InputError {
    Empty,
    Escapes(PathBuf),
    Unnamed(PathBuf),
    Unsupported(PathBuf),
}

impl std::error::Error for InputError {}
impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Empty => f.write_str("no input files"),
            InputError::Escapes(p) => write!(f, "input escapes the base directory: {:?}", p),
            InputError::Unnamed(p) => write!(f, "input has no name in the archive: {:?}", p),
            InputError::Unsupported(p) => write!(f, "unsupported file type: {:?}", p),
        }
    }
}

#[derive(Debug)]
struct Input {
    name: PathBuf,
    source: PathBuf,
    meta: Metadata,
}

/// Builds the single gzip-compressed tar layer of an image
#[derive(Clone, Debug)]
pub struct Layer {
    base: PathBuf,
    reproducible: bool,
    progress: bool,
}

impl Layer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            reproducible: false,
            progress: false,
        }
    }

    /// Normalize entry metadata so equal inputs give equal blobs
    pub fn reproducible(mut self, reproducible: bool) -> Self {
        self.reproducible = reproducible;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// The archive entry name of an input: its path relative to the base
    ///
    /// `..` components are resolved first, and only paths that still leave
    /// the base are rejected. Absolute paths are compared against the base
    /// with symlinks in their parent directories resolved.
    pub fn name(&self, path: &Path) -> Result<PathBuf, InputError> {
        let escapes = || InputError::Escapes(path.into());

        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.base) {
                Ok(relative) => relative.to_path_buf(),
                Err(..) => self.resolve(path).ok_or_else(escapes)?,
            }
        } else {
            path.to_path_buf()
        };

        let mut name = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => name.push(part),
                Component::CurDir => continue,
                Component::ParentDir if name.pop() => continue,
                _ => return Err(escapes()),
            }
        }

        if name.as_os_str().is_empty() {
            return Err(InputError::Unnamed(path.into()));
        }

        Ok(name)
    }

    /// The real path of `path` relative to the real base, if it is below it
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let base = fs::canonicalize(&self.base).ok()?;
        let parent = fs::canonicalize(path.parent()?).ok()?;
        let real = parent.join(path.file_name()?);

        real.strip_prefix(base).ok().map(Path::to_path_buf)
    }

    fn walk(
        &self,
        name: PathBuf,
        source: PathBuf,
        meta: Metadata,
        out: &mut Vec<Input>,
    ) -> Result<()> {
        if meta.is_file() {
            out.push(Input { name, source, meta });
            return Ok(());
        }

        if !meta.is_dir() {
            return Err(InputError::Unsupported(source).into());
        }

        let mut children = fs::read_dir(&source)
            .with_context(|| format!("unable to read {:?}", source))?
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("unable to read {:?}", source))?;
        children.sort_by_key(|child| child.file_name());

        out.push(Input {
            name: name.clone(),
            source,
            meta,
        });

        for child in children {
            let path = child.path();
            let meta = fs::symlink_metadata(&path)
                .with_context(|| format!("unable to read {:?}", path))?;

            if meta.file_type().is_symlink() {
                warn!("skipping symlink: {:?}", path);
                continue;
            }

            self.walk(name.join(child.file_name()), path, meta, out)?;
        }

        Ok(())
    }

    /// Archives `paths` into a new blob in `dir`
    ///
    /// Entries appear in input order; directories are expanded recursively in
    /// name order. All inputs are resolved before anything is written.
    pub fn build(&self, paths: &[PathBuf], dir: &Path) -> Result<Blob> {
        if paths.is_empty() {
            return Err(InputError::Empty.into());
        }

        let mut inputs = Vec::new();
        for path in paths {
            let name = self.name(path)?;
            let source = self.base.join(&name);
            let meta =
                fs::metadata(&source).with_context(|| format!("unable to read {:?}", path))?;
            self.walk(name, source, meta, &mut inputs)?;
        }

        let total = inputs
            .iter()
            .filter(|i| i.meta.is_file())
            .map(|i| i.meta.len())
            .sum();
        let progress = progress_bar("layer", total, self.progress);

        let mode = if self.reproducible {
            HeaderMode::Deterministic
        } else {
            HeaderMode::Complete
        };

        let blob = Blob::create(dir, |writer| {
            let encoder = GzEncoder::new(writer, Compression::best());
            let mut archive = Builder::new(encoder);
            archive.mode(mode);

            for input in &inputs {
                debug!("archiving {:?} as {:?}", input.source, input.name);

                let mut header = Header::new_gnu();
                header.set_metadata_in_mode(&input.meta, mode);

                let appended = if input.meta.is_dir() {
                    archive.append_data(&mut header, &input.name, std::io::empty())
                } else {
                    let file = File::open(&input.source)
                        .with_context(|| format!("unable to read {:?}", input.source))?;
                    let reader = progress.wrap_read(BufReader::new(file));
                    archive.append_data(&mut header, &input.name, reader)
                };

                appended.with_context(|| format!("unable to archive {:?}", input.source))?;
            }

            archive.into_inner()?.finish()?;
            Ok(())
        })?;

        progress.finish_and_clear();
        info!("layer {} ({} bytes, {} entries)", blob.digest, blob.size, inputs.len());
        Ok(blob)
    }
}
