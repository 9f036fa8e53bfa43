// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::super::Digest;

use serde::{Deserialize, Serialize};

/// The runtime configuration, always empty for file bundles
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub kind: String,

    /// Layer digests, bottom-most first
    pub diff_ids: Vec<Digest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub created: String,

    pub created_by: String,
}

/// The image configuration document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub created: String,

    pub architecture: String,

    pub os: String,

    #[serde(default)]
    pub config: Runtime,

    pub rootfs: RootFs,

    #[serde(default)]
    pub history: Vec<History>,
}

impl Config {
    pub const ARCHITECTURE: &'static str = "amd64";
    pub const OS: &'static str = "linux";

    pub fn new(created: String, creator: &str, layer: Digest) -> Self {
        Self {
            history: vec![History {
                created: created.clone(),
                created_by: creator.into(),
            }],
            created,
            architecture: Self::ARCHITECTURE.into(),
            os: Self::OS.into(),
            config: Runtime::default(),
            rootfs: RootFs {
                kind: "layers".into(),
                diff_ids: vec![layer],
            },
        }
    }
}
