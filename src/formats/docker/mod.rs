// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

//! Docker image manifest v2 schema 2 documents

pub mod image;
pub mod v2;
