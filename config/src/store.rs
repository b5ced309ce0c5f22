// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::dialect::{self, ConfigDialect};
use crate::tree::ConfigTree;
use failure::{format_err, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File-level wrapper around a [`ConfigTree`] and its on-disk dialect.
/// `load` makes a one-time `origin_*` backup of the file next to it, the
/// Rust analogue of the original's `cp current_config_file origin_config_file`.
pub struct ConfigStore {
    dialect: Box<dyn ConfigDialect>,
    path: PathBuf,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| format_err!("config path has no extension: {:?}", path))?;
        Ok(ConfigStore {
            dialect: dialect::for_extension(ext)?,
            path,
        })
    }

    /// Loads the tree, backing up the pristine file to `origin_<name>`
    /// alongside it if that backup doesn't already exist.
    pub fn load(&self) -> Result<ConfigTree> {
        let bytes = fs::read(&self.path)
            .map_err(|e| format_err!("failed to read config {:?}: {}", self.path, e))?;
        let origin_path = self.origin_backup_path();
        if !origin_path.exists() {
            fs::write(&origin_path, &bytes)
                .map_err(|e| format_err!("failed to write origin backup {:?}: {}", origin_path, e))?;
        }
        self.dialect.parse(&bytes)
    }

    /// Atomically writes `tree` to the live config path: write to a
    /// sibling temp file, then rename ("write-then-rename
    /// is acceptable").
    pub fn save(&self, tree: &ConfigTree) -> Result<()> {
        let bytes = self.dialect.serialize(tree)?;
        let tmp_path = self.path.with_extension(format!(
            "{}.tmp",
            self.path.extension().and_then(|e| e.to_str()).unwrap_or("cfg")
        ));
        fs::write(&tmp_path, &bytes)
            .map_err(|e| format_err!("failed to write {:?}: {}", tmp_path, e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| format_err!("failed to rename {:?} -> {:?}: {}", tmp_path, self.path, e))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes `tree` without writing it anywhere; used by callers that
    /// need the bytes for a purpose other than updating the live file (for
    /// instance, archiving the config alongside a failure artifact).
    pub fn serialize(&self, tree: &ConfigTree) -> Result<Vec<u8>> {
        self.dialect.serialize(tree)
    }

    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("cfg")
    }

    fn origin_backup_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("config");
        self.path
            .with_file_name(format!("origin_{}", file_name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_creates_origin_backup_once() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("node.toml");
        let mut f = fs::File::create(&config_path).unwrap();
        writeln!(f, "[consensus]\ntimeout_ms = 3000").unwrap();
        drop(f);

        let store = ConfigStore::open(&config_path).unwrap();
        let tree = store.load().unwrap();
        assert_eq!(
            tree.get("consensus.timeout_ms"),
            Some(&crate::value::LeafValue::Int(3000))
        );
        let origin_path = dir.path().join("origin_node.toml");
        assert!(origin_path.exists());

        // Mutate the live file; the backup must stay pristine.
        fs::write(&config_path, "[consensus]\ntimeout_ms = 0\n").unwrap();
        store.load().unwrap();
        let backup_contents = fs::read_to_string(&origin_path).unwrap();
        assert!(backup_contents.contains("3000"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("node.yaml");
        fs::write(&config_path, "consensus:\n  timeout_ms: 1000\n").unwrap();

        let store = ConfigStore::open(&config_path).unwrap();
        let mut tree = store.load().unwrap();
        tree.set("consensus.timeout_ms", crate::value::LeafValue::Int(0));
        store.save(&tree).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(
            reloaded.get("consensus.timeout_ms"),
            Some(&crate::value::LeafValue::Int(0))
        );
    }
}
