// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use failure::{format_err, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The category a configuration key belongs to, used to select the Tier A
/// mutation rule table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Consensus,
    Network,
    Storage,
    Transaction,
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

/// `config_type_map.json`: an ordered list of `(pattern, category)` pairs.
/// Lookup lowercases the key and scans patterns in declaration order; the
/// first substring match wins, unmatched keys fall back to `Other`.
///
/// This is a single orchestrator-loaded pattern table shared by all workers,
/// replacing the stringly-typed "pass a JSON path as a value" category
/// inference scheme with a typed, ordered list.
#[derive(Clone, Debug, Default)]
pub struct CategoryMap {
    patterns: Vec<(String, Category)>,
}

impl CategoryMap {
    pub fn new(patterns: Vec<(String, Category)>) -> Self {
        CategoryMap { patterns }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format_err!("failed to read category map {:?}: {}", path, e))?;
        Self::parse(&contents)
    }

    /// `serde_json::from_str` into a plain `HashMap` would lose the JSON
    /// object's declaration order, which is exactly the order §6 mandates
    /// for first-match-wins lookup; `IndexMap` preserves insertion order
    /// (i.e. the order keys appeared in the source document) through
    /// deserialization.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: IndexMap<String, Category> = serde_json::from_str(json)
            .map_err(|e| format_err!("failed to parse category map: {}", e))?;
        Ok(CategoryMap {
            patterns: raw.into_iter().collect(),
        })
    }

    /// Resolve the category for `key` by scanning patterns in declaration
    /// order against the lowercased key; first hit wins, default `Other`.
    pub fn resolve(&self, key: &str) -> Category {
        let lower = key.to_lowercase();
        for (pattern, category) in &self.patterns {
            if lower.contains(pattern.as_str()) {
                return *category;
            }
        }
        Category::Other
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unmatched_key_falls_back_to_other() {
        let map = CategoryMap::new(vec![("consensus".into(), Category::Consensus)]);
        assert_eq!(map.resolve("totally.unrelated.key"), Category::Other);
    }

    #[test]
    fn first_pattern_in_declaration_order_wins() {
        let map = CategoryMap::new(vec![
            ("port".into(), Category::Network),
            ("consensus".into(), Category::Consensus),
        ]);
        assert_eq!(map.resolve("consensus.safety_rules.backend"), Category::Consensus);
        assert_eq!(map.resolve("network.listen_port"), Category::Network);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let map = CategoryMap::new(vec![("backend".into(), Category::Consensus)]);
        assert_eq!(map.resolve("Consensus.SafetyRules.BACKEND"), Category::Consensus);
    }

    #[test]
    fn parse_preserves_json_declaration_order() {
        let map = CategoryMap::parse(
            r#"{"port": "network", "consensus": "consensus", "timeout": "consensus"}"#,
        )
        .unwrap();
        // "port" is declared before "consensus"; a key matching both must
        // resolve to the earlier-declared pattern's category.
        assert_eq!(map.resolve("consensus.port"), Category::Network);
    }
}
