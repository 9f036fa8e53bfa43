// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::scratch::with_scratch;
use super::{config, manifest, Blob, Direction, Layer, Reference, Transfer};
use crate::formats::Digest;

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;

/// The files of a freshly assembled image layout
#[derive(Clone, Debug)]
pub struct Assembled {
    pub layer: Blob,
    pub config: Blob,
    pub manifest: PathBuf,
}

/// Assembles single-layer images from local files
#[derive(Clone, Debug)]
pub struct Image {
    layer: Layer,
    reproducible: bool,
}

impl Image {
    /// Input paths are archived relative to `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            layer: Layer::new(base),
            reproducible: false,
        }
    }

    pub fn reproducible(mut self, reproducible: bool) -> Self {
        self.layer = self.layer.reproducible(reproducible);
        self.reproducible = reproducible;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.layer = self.layer.progress(progress);
        self
    }

    /// Writes the layer, config and manifest for `paths` into `dir`
    ///
    /// Each step needs the digest from the one before, so the first failure
    /// stops the assembly.
    pub fn assemble(&self, paths: &[PathBuf], dir: &Path) -> Result<Assembled> {
        let layer = self.layer.build(paths, dir)?;
        let created = config::created(self.reproducible)?;
        let config = config::build(layer.digest, &created, dir)?;
        let manifest = manifest::build(&config, &layer, dir)?;

        Ok(Assembled {
            layer,
            config,
            manifest,
        })
    }

    /// Assembles `paths` in a scratch directory and hands it to `transfer`
    ///
    /// Returns the config digest, which identifies the pushed image.
    pub fn push(
        &self,
        paths: &[PathBuf],
        reference: &Reference,
        transfer: &dyn Transfer,
    ) -> Result<Digest> {
        with_scratch(|dir| {
            let assembled = self.assemble(paths, dir)?;
            transfer.transfer(dir, reference, Direction::Push)?;

            info!("pushed {} as {}", assembled.config.digest, reference);
            Ok(assembled.config.digest)
        })
    }
}

#[cfg(test)]
mod test {
    use super::Image;
    use crate::api::layer::test::{entries, populate};
    use crate::api::transfer::fake::Registry;
    use crate::api::{Reference, TransferError};
    use crate::formats::docker::v2::{
        Manifest, CONFIG_MEDIA_TYPE, LAYER_MEDIA_TYPE, MANIFEST_MEDIA_TYPE,
    };
    use crate::formats::Digest;

    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn listing(dir: &std::path::Path) -> BTreeSet<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn content_addressing() {
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        populate(base.path(), &[("README.md", b"hello\n"), ("bin/tool", b"#!/bin/sh\n")]);

        let paths = vec![PathBuf::from("README.md"), PathBuf::from("bin/tool")];
        let assembled = Image::new(base.path()).assemble(&paths, out.path()).unwrap();

        let bytes = std::fs::read(&assembled.manifest).unwrap();
        let manifest: Manifest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(manifest.schema_version, 2);
        assert_eq!(manifest.media_type.as_deref(), Some(MANIFEST_MEDIA_TYPE));
        assert_eq!(manifest.config.media_type, CONFIG_MEDIA_TYPE);
        assert_eq!(manifest.layers.len(), 1);
        assert_eq!(manifest.layers[0].media_type, LAYER_MEDIA_TYPE);

        for descriptor in std::iter::once(&manifest.config).chain(manifest.layers.iter()) {
            let blob = std::fs::read(out.path().join(descriptor.digest.hex())).unwrap();
            assert_eq!(Digest::of(&blob), descriptor.digest);
            assert_eq!(blob.len() as u64, descriptor.size);
        }

        let expected: BTreeSet<String> = vec![
            "manifest.json".to_string(),
            assembled.config.digest.hex(),
            assembled.layer.digest.hex(),
        ]
        .into_iter()
        .collect();
        assert_eq!(listing(out.path()), expected);

        let names: Vec<String> = entries(&assembled.layer.path)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, ["README.md", "bin/tool"]);
    }

    #[test]
    fn fails_fast() {
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let paths = vec![PathBuf::from("missing.txt")];
        assert!(Image::new(base.path()).assemble(&paths, out.path()).is_err());
        assert!(listing(out.path()).is_empty());
    }

    #[test]
    fn reproducible() {
        let base = tempfile::tempdir().unwrap();
        populate(base.path(), &[("a.txt", b"alpha")]);
        let paths = vec![PathBuf::from("a.txt")];
        let image = Image::new(base.path()).reproducible(true);

        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        let first = image.assemble(&paths, one.path()).unwrap();
        let second = image.assemble(&paths, two.path()).unwrap();

        assert_eq!(first.layer.digest, second.layer.digest);
        assert_eq!(first.config.digest, second.config.digest);
    }

    #[test]
    fn push() {
        let base = tempfile::tempdir().unwrap();
        populate(base.path(), &[("a.txt", b"alpha")]);
        let reference: Reference = "localhost:5000/files:v1".parse().unwrap();
        let registry = Registry::default();

        let id = Image::new(base.path())
            .push(&[PathBuf::from("a.txt")], &reference, &registry)
            .unwrap();

        let images = registry.images.borrow();
        let files = &images[&reference.to_string()];
        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|(name, _)| *name == id.hex()));

        // The scratch layout is gone once the push returns.
        let layouts = registry.layouts.borrow();
        assert_eq!(layouts.len(), 1);
        assert!(!layouts[0].exists());
    }

    #[test]
    fn push_transfer_failure() {
        let base = tempfile::tempdir().unwrap();
        populate(base.path(), &[("a.txt", b"alpha")]);
        let reference: Reference = "files".parse().unwrap();
        let registry = Registry {
            status: Some(42),
            ..Default::default()
        };

        let err = Image::new(base.path())
            .push(&[PathBuf::from("a.txt")], &reference, &registry)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::Status(42))
        ));
        assert!(!registry.layouts.borrow()[0].exists());
    }

    #[test]
    fn push_input_failure() {
        let base = tempfile::tempdir().unwrap();
        let reference: Reference = "files".parse().unwrap();
        let registry = Registry::default();

        let paths = [PathBuf::from("missing.txt")];
        assert!(Image::new(base.path()).push(&paths, &reference, &registry).is_err());
        assert!(registry.layouts.borrow().is_empty());
    }
}
