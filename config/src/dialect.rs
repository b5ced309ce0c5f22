// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::tree::ConfigTree;
use crate::value::LeafValue;
use failure::{format_err, Result};
use std::collections::BTreeMap;

/// A concrete on-disk configuration dialect. Round-trip through
/// `parse`/`serialize` must preserve every key `all_keys` surfaces and every
/// leaf's type.
pub trait ConfigDialect: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigTree>;
    fn serialize(&self, tree: &ConfigTree) -> Result<Vec<u8>>;
}

/// Picks a dialect by the file's extension.
pub fn for_extension(ext: &str) -> Result<Box<dyn ConfigDialect>> {
    match ext {
        "ini" | "cfg" | "conf" => Ok(Box::new(IniDialect)),
        "yaml" | "yml" => Ok(Box::new(YamlDialect)),
        "toml" => Ok(Box::new(TomlDialect)),
        other => Err(format_err!("unsupported config dialect extension: {}", other)),
    }
}

/// Nested YAML/TOML-style dialect where keys already read `a.b.c`.
pub struct YamlDialect;

impl ConfigDialect for YamlDialect {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigTree> {
        let value: serde_yaml::Value = serde_yaml::from_slice(bytes)
            .map_err(|e| format_err!("failed to parse yaml config: {}", e))?;
        Ok(ConfigTree::flatten(&yaml_to_leaf(&value), false))
    }

    fn serialize(&self, tree: &ConfigTree) -> Result<Vec<u8>> {
        let nested = tree.to_nested();
        let yaml = leaf_to_yaml(&nested);
        serde_yaml::to_vec(&yaml).map_err(|e| format_err!("failed to serialize yaml config: {}", e))
    }
}

pub struct TomlDialect;

impl ConfigDialect for TomlDialect {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigTree> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| format_err!("config is not valid utf-8: {}", e))?;
        let value: toml::Value =
            toml::from_str(text).map_err(|e| format_err!("failed to parse toml config: {}", e))?;
        Ok(ConfigTree::flatten(&toml_to_leaf(&value), false))
    }

    fn serialize(&self, tree: &ConfigTree) -> Result<Vec<u8>> {
        let nested = tree.to_nested();
        let toml_value = leaf_to_toml(&nested);
        let text = toml::to_string_pretty(&toml_value)
            .map_err(|e| format_err!("failed to serialize toml config: {}", e))?;
        Ok(text.into_bytes())
    }
}

/// Flat `section.key = value` INI-style dialect. Missing sections are
/// created on `set` ("for paths with an undeclared section in a
/// flat dialect, the section is created" — enforced by `ConfigTree`'s
/// `flat_sections` flag, which this dialect always sets).
pub struct IniDialect;

impl ConfigDialect for IniDialect {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigTree> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| format_err!("config is not valid utf-8: {}", e))?;
        let mut leaves = BTreeMap::new();
        let mut section = String::new();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_string();
                continue;
            }
            if let Some(eq) = line.find('=') {
                let key = line[..eq].trim();
                let raw_value = line[eq + 1..].trim();
                let full_key = if section.is_empty() {
                    key.to_string()
                } else {
                    format!("{}.{}", section, key)
                };
                leaves.insert(full_key, parse_ini_scalar(raw_value));
            }
        }
        Ok(ConfigTree::from_flat(leaves, true))
    }

    fn serialize(&self, tree: &ConfigTree) -> Result<Vec<u8>> {
        let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for key in tree.all_keys() {
            let value = tree.get(key).expect("key came from all_keys");
            let (section, name) = match key.find('.') {
                Some(idx) => (key[..idx].to_string(), key[idx + 1..].to_string()),
                None => (String::new(), key.to_string()),
            };
            sections
                .entry(section)
                .or_default()
                .push((name, format_ini_scalar(value)));
        }
        let mut out = String::new();
        for (section, entries) in sections {
            if !section.is_empty() {
                out.push_str(&format!("[{}]\n", section));
            }
            for (name, value) in entries {
                out.push_str(&format!("{} = {}\n", name, value));
            }
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

fn parse_ini_scalar(raw: &str) -> LeafValue {
    if raw.is_empty() {
        return LeafValue::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return LeafValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return LeafValue::Float(f);
    }
    match raw {
        "true" | "True" => LeafValue::Bool(true),
        "false" | "False" => LeafValue::Bool(false),
        _ => LeafValue::Str(raw.trim_matches('"').to_string()),
    }
}

fn format_ini_scalar(value: &LeafValue) -> String {
    match value {
        LeafValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn yaml_to_leaf(value: &serde_yaml::Value) -> LeafValue {
    match value {
        serde_yaml::Value::Null => LeafValue::Null,
        serde_yaml::Value::Bool(b) => LeafValue::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                LeafValue::Int(i)
            } else {
                LeafValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_yaml::Value::String(s) => LeafValue::Str(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            LeafValue::List(items.iter().map(yaml_to_leaf).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                if let serde_yaml::Value::String(key) = k {
                    out.insert(key.clone(), yaml_to_leaf(v));
                }
            }
            LeafValue::Map(out)
        }
    }
}

fn leaf_to_yaml(value: &LeafValue) -> serde_yaml::Value {
    match value {
        LeafValue::Null => serde_yaml::Value::Null,
        LeafValue::Bool(b) => serde_yaml::Value::Bool(*b),
        LeafValue::Int(i) => serde_yaml::Value::Number((*i).into()),
        LeafValue::Float(f) => serde_yaml::Value::Number((*f).into()),
        LeafValue::Str(s) => serde_yaml::Value::String(s.clone()),
        LeafValue::List(items) => {
            serde_yaml::Value::Sequence(items.iter().map(leaf_to_yaml).collect())
        }
        LeafValue::Map(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (k, v) in map {
                out.insert(serde_yaml::Value::String(k.clone()), leaf_to_yaml(v));
            }
            serde_yaml::Value::Mapping(out)
        }
    }
}

fn toml_to_leaf(value: &toml::Value) -> LeafValue {
    match value {
        toml::Value::Boolean(b) => LeafValue::Bool(*b),
        toml::Value::Integer(i) => LeafValue::Int(*i),
        toml::Value::Float(f) => LeafValue::Float(*f),
        toml::Value::String(s) => LeafValue::Str(s.clone()),
        toml::Value::Datetime(d) => LeafValue::Str(d.to_string()),
        toml::Value::Array(items) => LeafValue::List(items.iter().map(toml_to_leaf).collect()),
        toml::Value::Table(table) => {
            let mut out = BTreeMap::new();
            for (k, v) in table {
                out.insert(k.clone(), toml_to_leaf(v));
            }
            LeafValue::Map(out)
        }
    }
}

/// TOML has no null; a `Null` leaf is dropped rather than written (design
/// note: "some dialects cannot round-trip it — either skip
/// writing or emit the dialect-specific null").
fn leaf_to_toml(value: &LeafValue) -> toml::Value {
    match value {
        LeafValue::Null => toml::Value::String(String::new()),
        LeafValue::Bool(b) => toml::Value::Boolean(*b),
        LeafValue::Int(i) => toml::Value::Integer(*i),
        LeafValue::Float(f) => toml::Value::Float(*f),
        LeafValue::Str(s) => toml::Value::String(s.clone()),
        LeafValue::List(items) => toml::Value::Array(items.iter().map(leaf_to_toml).collect()),
        LeafValue::Map(map) => {
            let mut out = toml::value::Table::new();
            for (k, v) in map {
                if matches!(v, LeafValue::Null) {
                    continue;
                }
                out.insert(k.clone(), leaf_to_toml(v));
            }
            toml::Value::Table(out)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yaml_round_trip_preserves_keys_and_types() {
        let dialect = YamlDialect;
        let input = b"consensus:\n  backend: vault\n  timeout_ms: 3000\nnetwork:\n  enable_tls: true\n";
        let tree = dialect.parse(input).unwrap();
        let mut keys = tree.all_keys();
        keys.sort();
        assert_eq!(
            keys,
            vec!["consensus.backend", "consensus.timeout_ms", "network.enable_tls"]
        );
        let bytes = dialect.serialize(&tree).unwrap();
        let reparsed = dialect.parse(&bytes).unwrap();
        for key in tree.all_keys() {
            assert_eq!(tree.get(key), reparsed.get(key));
        }
    }

    #[test]
    fn toml_round_trip_preserves_keys_and_types() {
        let dialect = TomlDialect;
        let input = b"[storage]\ncache_size = 1024\nenable = false\n";
        let tree = dialect.parse(input).unwrap();
        let bytes = dialect.serialize(&tree).unwrap();
        let reparsed = dialect.parse(&bytes).unwrap();
        for key in tree.all_keys() {
            assert_eq!(tree.get(key), reparsed.get(key));
        }
    }

    #[test]
    fn ini_round_trip_creates_undeclared_sections() {
        let dialect = IniDialect;
        let input = b"[consensus]\ntimeout_ms = 3000\nenable = true\n";
        let mut tree = dialect.parse(input).unwrap();
        tree.set("new_section.fresh_key", LeafValue::Str("value".to_string()));
        assert!(tree.is_flat_sections());
        let bytes = dialect.serialize(&tree).unwrap();
        let reparsed = dialect.parse(&bytes).unwrap();
        assert_eq!(
            reparsed.get("new_section.fresh_key"),
            Some(&LeafValue::Str("value".to_string()))
        );
        assert_eq!(reparsed.get("consensus.timeout_ms"), Some(&LeafValue::Int(3000)));
    }
}
