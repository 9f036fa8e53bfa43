// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

pub mod digest;
pub mod docker;

pub use self::digest::{Digest, Hasher};
