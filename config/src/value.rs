// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A leaf value in a [`crate::ConfigTree`](crate::tree::ConfigTree).
///
/// `Null` is the first-class stand-in for the source tool's untyped
/// "empty"/`NOT_PRESENT` value; dialects that
/// cannot round-trip a null either skip writing the key or emit their own
/// null token (see `dialect`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeafValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<LeafValue>),
    Map(BTreeMap<String, LeafValue>),
    Null,
}

impl LeafValue {
    pub fn kind(&self) -> LeafKind {
        match self {
            LeafValue::Bool(_) => LeafKind::Bool,
            LeafValue::Int(_) => LeafKind::Int,
            LeafValue::Float(_) => LeafKind::Float,
            LeafValue::Str(_) => LeafKind::Str,
            LeafValue::List(_) => LeafKind::List,
            LeafValue::Map(_) => LeafKind::Map,
            LeafValue::Null => LeafKind::Null,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LeafValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            LeafValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            LeafValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LeafValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafValue::Bool(b) => write!(f, "{}", b),
            LeafValue::Int(i) => write!(f, "{}", i),
            LeafValue::Float(v) => write!(f, "{}", v),
            LeafValue::Str(s) => write!(f, "{}", s),
            LeafValue::List(items) => write!(f, "{:?}", items),
            LeafValue::Map(m) => write!(f, "{:?}", m),
            LeafValue::Null => write!(f, "<null>"),
        }
    }
}

/// The tag half of [`LeafValue`], used to dispatch Tier B mutator rules and
/// to group a tree's values by type (the original's `type_to_values_map`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Null,
}
