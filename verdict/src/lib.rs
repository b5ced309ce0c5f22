// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! The verdict engine: commit a candidate config to disk, restart the node
//! under the global restart mutex, then classify the outcome through a
//! staged liveness check.

use nodefuzz_config::{ConfigStore, ConfigTree};
use nodefuzz_node::artifact::timestamp_now;
use nodefuzz_node::panic_log::{extract_signature, PanicDeduper};
use nodefuzz_node::{ArtifactStore, NodeRunner};
use std::fs;
use std::sync::Mutex;
use std::time::Duration;

/// Sustain-probe round count after a node survives the initial start check.
pub const CHECK_TIMES: u32 = 5;
/// Total sustain window, divided evenly across `CHECK_TIMES` probes.
pub const RUN_TIME_FOR_CRASH: Duration = Duration::from_secs(20);
/// Default quiescence after `restart()`, before the start check; worker
/// role/node type may override within the 5-10s band.
pub const POST_RESTART_DELAY: Duration = Duration::from_secs(7);

/// Process-wide lock preventing two workers from invoking node-control
/// scripts at the same time (the scripts may use process-name globs that
/// cross-talk between nodes).
pub type RestartMutex = Mutex<()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Survived,
    StartupFailure,
    RuntimeFailure,
}

#[derive(Clone, Debug)]
pub struct VerdictConfig {
    pub post_restart_delay: Duration,
    pub run_time_for_crash: Duration,
    pub check_times: u32,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        VerdictConfig {
            post_restart_delay: POST_RESTART_DELAY,
            run_time_for_crash: RUN_TIME_FOR_CRASH,
            check_times: CHECK_TIMES,
        }
    }
}

/// Commits `tree`, restarts the node, and returns the classification.
/// Writes a failure artifact through `artifacts` whenever the outcome isn't
/// `Survived`.
pub fn evaluate(
    config: &VerdictConfig,
    restart_mutex: &RestartMutex,
    store: &ConfigStore,
    tree: &ConfigTree,
    runner: &dyn NodeRunner,
    artifacts: &ArtifactStore,
    dedup: &PanicDeduper,
) -> failure::Result<Classification> {
    store.save(tree)?;

    {
        let _guard = restart_mutex.lock().unwrap();
        runner.restart()?;
    }
    std::thread::sleep(config.post_restart_delay);

    if !runner.is_alive() {
        return startup_failure(store, tree, runner, artifacts, dedup);
    }

    let per_probe = config.run_time_for_crash / config.check_times.max(1);
    for _ in 0..config.check_times {
        std::thread::sleep(per_probe);
        if !runner.is_alive() {
            let ts = timestamp_now();
            let bytes = store.serialize(tree)?;
            artifacts.write_runtime_error(&ts, store.extension(), &bytes)?;
            slog_scope::warn!("node died during the sustain window"; "timestamp" => ts);
            return Ok(Classification::RuntimeFailure);
        }
    }

    Ok(Classification::Survived)
}

fn startup_failure(
    store: &ConfigStore,
    tree: &ConfigTree,
    runner: &dyn NodeRunner,
    artifacts: &ArtifactStore,
    dedup: &PanicDeduper,
) -> failure::Result<Classification> {
    let ts = timestamp_now();
    let bytes = store.serialize(tree)?;
    let log_bytes = fs::read(runner.panic_log_path()).unwrap_or_default();
    let log_text = String::from_utf8_lossy(&log_bytes);
    match extract_signature(&log_text) {
        Some(signature) if dedup.is_new(&signature) => {
            artifacts.write_panic_error(&ts, store.extension(), &bytes, &log_bytes)?;
        }
        _ => {
            slog_scope::debug!("startup failure with a known or absent panic signature; recording as a start error");
            artifacts.write_start_error(&ts, store.extension(), &bytes)?;
        }
    }
    Ok(Classification::StartupFailure)
}

#[cfg(test)]
mod test {
    use super::*;
    use nodefuzz_config::LeafValue;
    use nodefuzz_node::fake::FakeNodeRunner;
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn fast_config() -> VerdictConfig {
        VerdictConfig {
            post_restart_delay: Duration::from_millis(1),
            run_time_for_crash: Duration::from_millis(5),
            check_times: 5,
        }
    }

    fn sample_store(dir: &std::path::Path) -> ConfigStore {
        let path = dir.join("node.toml");
        stdfs::write(&path, "timeout_ms = 3000\n").unwrap();
        ConfigStore::open(&path).unwrap()
    }

    #[test]
    fn all_probes_passing_classifies_survived() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        let mut tree = store.load().unwrap();
        tree.set("timeout_ms", LeafValue::Int(0));
        let runner = FakeNodeRunner::new(vec![true]);
        let artifacts = ArtifactStore::new(dir.path(), "worker-0").unwrap();
        let dedup = PanicDeduper::new();
        let restart_mutex = Mutex::new(());

        let verdict = evaluate(&fast_config(), &restart_mutex, &store, &tree, &runner, &artifacts, &dedup).unwrap();
        assert_eq!(verdict, Classification::Survived);
    }

    #[test]
    fn dead_immediately_after_restart_is_startup_failure() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        let tree = store.load().unwrap();
        let runner = FakeNodeRunner::new(vec![false]);
        let artifacts = ArtifactStore::new(dir.path(), "worker-1").unwrap();
        let dedup = PanicDeduper::new();
        let restart_mutex = Mutex::new(());

        let verdict = evaluate(&fast_config(), &restart_mutex, &store, &tree, &runner, &artifacts, &dedup).unwrap();
        assert_eq!(verdict, Classification::StartupFailure);
    }

    #[test]
    fn dies_mid_sustain_window_is_runtime_failure() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        let tree = store.load().unwrap();
        // alive for the start check, then dies on the first sustain probe.
        let runner = FakeNodeRunner::new(vec![true, false]);
        let artifacts = ArtifactStore::new(dir.path(), "worker-2").unwrap();
        let dedup = PanicDeduper::new();
        let restart_mutex = Mutex::new(());

        let verdict = evaluate(&fast_config(), &restart_mutex, &store, &tree, &runner, &artifacts, &dedup).unwrap();
        assert_eq!(verdict, Classification::RuntimeFailure);
    }
}
