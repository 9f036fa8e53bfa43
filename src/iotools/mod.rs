// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

//! Utility types for hashing data as it passes through writers

mod tally;

pub use tally::Tally;
