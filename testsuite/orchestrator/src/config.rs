// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Orchestrator-level tunables and the node roster, loaded once at startup
//! from a small TOML file (the same `serde` + `toml` stack `nodefuzz-config`
//! uses for node configs themselves).

use failure::{format_err, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default cadence (in completed rounds, across all workers) at which the
/// Reporter snapshots the knowledge base to disk.
pub const DEFAULT_REPORT_INTERVAL: u64 = 20;

/// Default post-restart quiescence the verdict engine waits before the
/// start check; workers may override within the 5-10s band spec.md §4.5
/// allows.
pub const DEFAULT_POST_RESTART_DELAY_SECS: u64 = 7;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Fuzzing,
    Exploration,
}

impl Default for NodeRole {
    fn default() -> Self {
        NodeRole::Fuzzing
    }
}

/// One worker's node binding: its working directory (must contain
/// `start.sh`/`stop.sh`), its live config file, the process-listing
/// selector used for liveness, and its role in the pool.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub dir: PathBuf,
    pub config_path: PathBuf,
    pub liveness_selector: String,
    #[serde(default)]
    pub role: NodeRole,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrchestratorConfig {
    /// Root directory under which each worker gets its own results
    /// subdirectory (`panic_error/`, `start_error/`, `runtime_error/`) plus
    /// the shared `reports/` directory.
    pub results_root: PathBuf,
    /// `config_type_map.json` — the key-to-category pattern table.
    pub category_map_path: PathBuf,
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    #[serde(default = "default_consistent_threshold")]
    pub consistent_threshold: usize,
    #[serde(default = "default_post_restart_delay_secs")]
    pub post_restart_delay_secs: u64,
    pub nodes: Vec<NodeSpec>,
}

fn default_report_interval() -> u64 {
    DEFAULT_REPORT_INTERVAL
}

fn default_consistent_threshold() -> usize {
    nodefuzz_kb::CONSISTENT_THRESHOLD
}

fn default_post_restart_delay_secs() -> u64 {
    DEFAULT_POST_RESTART_DELAY_SECS
}

impl OrchestratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| format_err!("failed to read orchestrator config {:?}: {}", path, e))?;
        let config: OrchestratorConfig = toml::from_str(&text)
            .map_err(|e| format_err!("failed to parse orchestrator config {:?}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Two roles coexist in the same pool: exactly one exploration worker,
    /// the rest fuzzing (spec.md §1, §4.7).
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(format_err!("orchestrator config declares no nodes"));
        }
        let exploration_count = self
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Exploration)
            .count();
        if exploration_count != 1 {
            return Err(format_err!(
                "expected exactly one exploration worker, found {}",
                exploration_count
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("orchestrator.toml");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn rejects_a_roster_with_no_exploration_worker() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            results_root = "./results"
            category_map_path = "./config_type_map.json"

            [[nodes]]
            name = "node-0"
            dir = "./nodes/node-0"
            config_path = "./nodes/node-0/node.toml"
            liveness_selector = "node-0"
            "#,
        );
        let err = OrchestratorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("exactly one exploration worker"));
    }

    #[test]
    fn accepts_a_single_exploration_worker_among_fuzzing_workers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            results_root = "./results"
            category_map_path = "./config_type_map.json"

            [[nodes]]
            name = "node-0"
            dir = "./nodes/node-0"
            config_path = "./nodes/node-0/node.toml"
            liveness_selector = "node-0"
            role = "exploration"

            [[nodes]]
            name = "node-1"
            dir = "./nodes/node-1"
            config_path = "./nodes/node-1/node.toml"
            liveness_selector = "node-1"
            "#,
        );
        let config = OrchestratorConfig::load(&path).unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.report_interval, DEFAULT_REPORT_INTERVAL);
        assert_eq!(config.nodes[1].role, NodeRole::Fuzzing);
    }
}
