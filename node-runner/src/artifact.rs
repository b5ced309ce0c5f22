// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! On-disk layout for failure artifacts, partitioned per worker and by
//! failure kind (`panic_error/`, `start_error/`, `runtime_error/`).

use std::fs;
use std::path::{Path, PathBuf};

/// Current local time formatted for use as an artifact directory name.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Owns one worker's results directory.
pub struct ArtifactStore {
    worker_root: PathBuf,
    worker_name: String,
}

impl ArtifactStore {
    pub fn new(results_root: &Path, worker_name: &str) -> failure::Result<Self> {
        let worker_root = results_root.join(worker_name);
        for kind in &["panic_error", "start_error", "runtime_error"] {
            fs::create_dir_all(worker_root.join(kind))?;
        }
        Ok(ArtifactStore {
            worker_root,
            worker_name: worker_name.to_string(),
        })
    }

    pub fn worker_log_path(&self) -> PathBuf {
        self.worker_root.join(format!("{}.log", self.worker_name))
    }

    /// Archives a startup failure whose panic signature has not been seen
    /// before on this worker: `panic_error/<ts>/panic_error.<ext>` plus a
    /// copy of the node log.
    pub fn write_panic_error(
        &self,
        timestamp: &str,
        ext: &str,
        config_bytes: &[u8],
        node_log: &[u8],
    ) -> failure::Result<PathBuf> {
        let dir = self.worker_root.join("panic_error").join(timestamp);
        fs::create_dir_all(&dir)?;
        let config_path = dir.join(format!("panic_error.{}", ext));
        fs::write(&config_path, config_bytes)?;
        fs::write(dir.join("node.log"), node_log)?;
        slog_scope::info!("archived new panic signature"; "worker" => self.worker_name.as_str(), "path" => config_path.to_string_lossy().into_owned());
        Ok(config_path)
    }

    /// Archives a startup failure whose panic signature is either absent or
    /// already archived: `start_error/<ts>/start_error.<ext>.<ts>`.
    pub fn write_start_error(
        &self,
        timestamp: &str,
        ext: &str,
        config_bytes: &[u8],
    ) -> failure::Result<PathBuf> {
        let dir = self.worker_root.join("start_error").join(timestamp);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("start_error.{}.{}", ext, timestamp));
        fs::write(&path, config_bytes)?;
        Ok(path)
    }

    /// Archives a sustain-probe failure: `runtime_error/<ts>/runtime_error.<ext>.<ts>`.
    pub fn write_runtime_error(
        &self,
        timestamp: &str,
        ext: &str,
        config_bytes: &[u8],
    ) -> failure::Result<PathBuf> {
        let dir = self.worker_root.join("runtime_error").join(timestamp);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("runtime_error.{}.{}", ext, timestamp));
        fs::write(&path, config_bytes)?;
        Ok(path)
    }

    /// Number of distinct panic signatures archived so far, for the
    /// dedup-count invariant.
    pub fn panic_error_count(&self) -> usize {
        fs::read_dir(self.worker_root.join("panic_error"))
            .map(|rd| rd.count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_panic_error_creates_dedicated_directory_and_log_copy() {
        let root = tempdir().unwrap();
        let store = ArtifactStore::new(root.path(), "worker-0").unwrap();
        let path = store
            .write_panic_error("20260101000000", "toml", b"key = 1", b"thread panicked")
            .unwrap();
        assert!(path.exists());
        assert!(path.parent().unwrap().join("node.log").exists());
        assert_eq!(store.panic_error_count(), 1);
    }

    #[test]
    fn start_and_runtime_errors_land_in_separate_trees() {
        let root = tempdir().unwrap();
        let store = ArtifactStore::new(root.path(), "worker-1").unwrap();
        let start_path = store.write_start_error("ts1", "ini", b"a=1").unwrap();
        let runtime_path = store.write_runtime_error("ts2", "ini", b"a=2").unwrap();
        assert!(start_path.to_string_lossy().contains("start_error"));
        assert!(runtime_path.to_string_lossy().contains("runtime_error"));
    }
}
