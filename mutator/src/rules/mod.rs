// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tier A name-based rule tables, one module per category.
//! Each `propose` scans markers in a fixed order; the first substring match
//! wins. Returns `None` to fall through to Tier B when nothing matched.

pub mod consensus;
pub mod network;
pub mod storage;
pub mod transaction;
