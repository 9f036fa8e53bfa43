// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::formats::Digest;

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Error, Result};
use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Target {
    Tag(String),
    Digest(Digest),
}

/// A remote image: `[registry/]name[:tag|@digest]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    host: String,
    path: String,
    target: Target,
}

impl Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Target::Tag(tag) => write!(f, "{}/{}:{}", self.host, self.path, tag),
            Target::Digest(digest) => write!(f, "{}/{}@{}", self.host, self.path, digest),
        }
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Reference {
    const DEFAULT_REGISTRY: &'static str = "docker.io";
    const DEFAULT_PREFIX: &'static str = "library";
    const DEFAULT_TAG: &'static str = "latest";

    const LOCALHOST: &'static str = "localhost";

    const TAG: &'static str = "^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$";
    const PATH: &'static str =
        "^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*(?:/[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*)*$";

    pub fn new(reference: &str) -> Result<Self> {
        let invalid = || anyhow!("invalid image reference: {:?}", reference);
        let mut repository = reference;

        // Remove any digest or tag
        let target = if let Some((lhs, rhs)) = repository.split_once('@') {
            repository = lhs;
            let digest = rhs.parse::<Digest>().with_context(invalid)?;
            Target::Digest(digest)
        } else {
            let sep = repository.rfind('/').unwrap_or_default();
            match repository.rfind(':') {
                Some(lbl) if lbl > sep || !repository.contains('/') => {
                    let (lhs, rhs) = repository.split_at(lbl);
                    repository = lhs;
                    Target::Tag(rhs[1..].into())
                }
                _ => Target::Tag(Self::DEFAULT_TAG.into()),
            }
        };

        if let Target::Tag(tag) = &target {
            if !Regex::new(Self::TAG)?.is_match(tag) {
                return Err(invalid());
            }
        }

        // Extract the registry
        let mut host = Self::DEFAULT_REGISTRY;
        if let Some((lhs, rhs)) = repository.split_once('/') {
            if lhs.contains('.') || lhs.contains(':') || lhs == Self::LOCALHOST {
                repository = rhs;
                host = lhs;
            }
        }

        // Add the default prefix if necessary.
        let path = match repository.find('/') {
            None if host == Self::DEFAULT_REGISTRY => {
                format!("{}/{}", Self::DEFAULT_PREFIX, repository)
            }
            _ => repository.into(),
        };

        if !Regex::new(Self::PATH)?.is_match(&path) {
            return Err(invalid());
        }

        Ok(Self {
            host: host.into(),
            path,
            target,
        })
    }

    /// The reference in the `docker://` transport syntax
    pub fn transport(&self) -> String {
        format!("docker://{}", self)
    }
}
