// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::category::{Category, CategoryMap};
use crate::value::{LeafKind, LeafValue};
use std::collections::BTreeMap;

/// A flattened configuration document: dotted-path key -> leaf value, plus
/// the pristine original value captured once at load time.
///
/// Invariant: for every key ever surfaced via `all_keys`, `origin`
/// carries an entry.
#[derive(Clone, Debug, Default)]
pub struct ConfigTree {
    leaves: BTreeMap<String, LeafValue>,
    origin: BTreeMap<String, LeafValue>,
    /// Whether this dialect wants missing intermediate sections created on
    /// `set` (flat section.key dialects) rather than requiring the path to
    /// already exist (nested dialects).
    flat_sections: bool,
}

impl ConfigTree {
    /// Build a tree from an already-flattened map, capturing it as the
    /// original snapshot. This is the output of `flatten`.
    pub fn from_flat(leaves: BTreeMap<String, LeafValue>, flat_sections: bool) -> Self {
        ConfigTree {
            origin: leaves.clone(),
            leaves,
            flat_sections,
        }
    }

    /// Deterministically flattens a nested document into dotted-path keys,
    /// `.` as separator. Arrays are opaque leaves, never descended into.
    pub fn flatten(document: &LeafValue, flat_sections: bool) -> Self {
        let mut leaves = BTreeMap::new();
        flatten_into(document, None, &mut leaves);
        Self::from_flat(leaves, flat_sections)
    }

    /// Stable, ordered list of leaf keys.
    pub fn all_keys(&self) -> Vec<&str> {
        self.leaves.keys().map(String::as_str).collect()
    }

    pub fn get(&self, key: &str) -> Option<&LeafValue> {
        self.leaves.get(key)
    }

    pub fn origin_value(&self, key: &str) -> Option<&LeafValue> {
        self.origin.get(key)
    }

    /// Leaf kind of `key`, skipping list-typed leaves from key selection is
    /// the worker's job, not the tree's.
    pub fn kind_of(&self, key: &str) -> Option<LeafKind> {
        self.leaves.get(key).map(LeafValue::kind)
    }

    /// All currently observed values sharing `kind`: extra candidate
    /// material for Tier B mutation, beyond the fixed literal pools.
    pub fn values_of_kind(&self, kind: LeafKind) -> Vec<&LeafValue> {
        self.leaves
            .values()
            .filter(|v| v.kind() == kind)
            .collect()
    }

    /// Sets `key` to `value`. For flat-section dialects, creates the
    /// section if it doesn't exist yet; for nested dialects the path must
    /// already have been surfaced by `flatten`.
    pub fn set(&mut self, key: &str, value: LeafValue) {
        self.leaves.insert(key.to_string(), value);
    }

    /// No-op if `key` is absent.
    pub fn delete(&mut self, key: &str) {
        self.leaves.remove(key);
    }

    pub fn is_flat_sections(&self) -> bool {
        self.flat_sections
    }

    /// Rebuilds the nested document this tree flattened from, for
    /// serialization by a `ConfigDialect`.
    pub fn to_nested(&self) -> LeafValue {
        let mut root = LeafValue::Map(BTreeMap::new());
        for (key, value) in &self.leaves {
            insert_nested(&mut root, key, value.clone());
        }
        root
    }

    /// Resolves the category of every key via `map`, used by workers to
    /// pick the Tier A rule table.
    pub fn category_of(&self, key: &str, map: &CategoryMap) -> Category {
        map.resolve(key)
    }
}

fn flatten_into(value: &LeafValue, prefix: Option<&str>, out: &mut BTreeMap<String, LeafValue>) {
    match value {
        LeafValue::Map(entries) => {
            for (k, v) in entries {
                let full_key = match prefix {
                    Some(p) => format!("{}.{}", p, k),
                    None => k.clone(),
                };
                match v {
                    LeafValue::Map(_) => flatten_into(v, Some(&full_key), out),
                    other => {
                        out.insert(full_key, other.clone());
                    }
                }
            }
        }
        other => {
            if let Some(p) = prefix {
                out.insert(p.to_string(), other.clone());
            }
        }
    }
}

fn insert_nested(root: &mut LeafValue, key: &str, value: LeafValue) {
    let mut parts = key.split('.').peekable();
    let mut cursor = root;
    while let Some(part) = parts.next() {
        let map = match cursor {
            LeafValue::Map(m) => m,
            _ => unreachable!("insert_nested cursor must always be a Map"),
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        cursor = map
            .entry(part.to_string())
            .or_insert_with(|| LeafValue::Map(BTreeMap::new()));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> LeafValue {
        let mut consensus = BTreeMap::new();
        consensus.insert("timeout_ms".to_string(), LeafValue::Int(30_000));
        consensus.insert("enable".to_string(), LeafValue::Bool(true));
        let mut root = BTreeMap::new();
        root.insert("consensus".to_string(), LeafValue::Map(consensus));
        root.insert("name".to_string(), LeafValue::Str("node0".to_string()));
        LeafValue::Map(root)
    }

    #[test]
    fn flatten_produces_dotted_keys() {
        let tree = ConfigTree::flatten(&sample(), false);
        let mut keys = tree.all_keys();
        keys.sort();
        assert_eq!(keys, vec!["consensus.enable", "consensus.timeout_ms", "name"]);
    }

    #[test]
    fn origin_snapshot_is_independent_of_later_sets() {
        let mut tree = ConfigTree::flatten(&sample(), false);
        tree.set("consensus.timeout_ms", LeafValue::Int(0));
        assert_eq!(tree.get("consensus.timeout_ms"), Some(&LeafValue::Int(0)));
        assert_eq!(
            tree.origin_value("consensus.timeout_ms"),
            Some(&LeafValue::Int(30_000))
        );
    }

    #[test]
    fn delete_is_noop_if_absent() {
        let mut tree = ConfigTree::flatten(&sample(), false);
        tree.delete("does.not.exist");
        assert_eq!(tree.all_keys().len(), 3);
    }

    #[test]
    fn round_trip_preserves_keys_and_types() {
        let tree = ConfigTree::flatten(&sample(), false);
        let nested = tree.to_nested();
        let rebuilt = ConfigTree::flatten(&nested, false);
        let mut a = tree.all_keys();
        let mut b = rebuilt.all_keys();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        for key in a {
            assert_eq!(tree.get(key), rebuilt.get(key));
        }
    }
}
