// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Periodic knowledge-base snapshot writer. Wakes every `interval`
//! completed rounds (summed across all workers) and renders a fixed-format
//! report file, the Rust analogue of `format_set_content`/the report writer
//! in `new_rule_guided_config_fuzz.py`.

use failure::{format_err, Result};
use nodefuzz_kb::{KnowledgeBase, Snapshot};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Reporter {
    kb: KnowledgeBase,
    reports_dir: PathBuf,
    interval: u64,
    completed: AtomicU64,
}

impl Reporter {
    pub fn new(kb: KnowledgeBase, reports_dir: PathBuf, interval: u64) -> Result<Self> {
        fs::create_dir_all(&reports_dir)
            .map_err(|e| format_err!("failed to create reports dir {:?}: {}", reports_dir, e))?;
        Ok(Reporter {
            kb,
            reports_dir,
            interval: interval.max(1),
            completed: AtomicU64::new(0),
        })
    }

    /// Called once per completed round, from any worker thread. Every
    /// `interval`-th call renders a report; the rest are no-ops. Returns the
    /// path written, if any.
    pub fn record_round(&self) -> Result<Option<PathBuf>> {
        let count = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.interval != 0 {
            return Ok(None);
        }
        let snapshot = self.kb.snapshot();
        let path = self.reports_dir.join(format!("sets_status_{}.txt", count));
        fs::write(&path, render(&snapshot, count))
            .map_err(|e| format_err!("failed to write report {:?}: {}", path, e))?;
        Ok(Some(path))
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}

fn render(snapshot: &Snapshot, total_count: u64) -> String {
    let mut out = String::new();
    out.push_str("###### Configuration Item Consistency Test Status Report\n");
    out.push_str(&format!(
        "Generated Time: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Total Test Count: {}\n", total_count));

    out.push_str(&format!(
        "====== Must-be-consistent Configuration Items ({} items) ======\n",
        snapshot.consistent.len()
    ));
    for (key, failure_count) in &snapshot.consistent {
        out.push_str(&format!("- {}    [Failure Count: {}]\n", key, failure_count));
    }

    out.push_str(&format!(
        "====== Can-be-inconsistent Configuration Items ({} items) ======\n",
        snapshot.inconsistent.len()
    ));
    for key in &snapshot.inconsistent {
        out.push_str(&format!("- {}\n", key));
    }

    out.push_str("------ Summary Statistics ------\n");
    out.push_str(&format!(
        "- Number of must-be-consistent items: {}\n",
        snapshot.consistent.len()
    ));
    out.push_str(&format!(
        "- Number of can-be-inconsistent items: {}\n",
        snapshot.inconsistent.len()
    ));
    out.push_str(&format!(
        "- Failure threshold setting: {}\n",
        snapshot.threshold
    ));
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use nodefuzz_config::LeafValue;
    use nodefuzz_kb::Candidate;
    use tempfile::tempdir;

    #[test]
    fn writes_no_report_before_interval_is_reached() {
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(KnowledgeBase::new(), dir.path().join("reports"), 3).unwrap();
        assert!(reporter.record_round().unwrap().is_none());
        assert!(reporter.record_round().unwrap().is_none());
    }

    #[test]
    fn writes_a_report_every_interval_rounds() {
        let dir = tempdir().unwrap();
        let kb = KnowledgeBase::with_threshold(2);
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(0)));
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(-1)));
        kb.record_success("network.enable_tls", Candidate::Value(LeafValue::Bool(false)));

        let reporter = Reporter::new(kb, dir.path().join("reports"), 2).unwrap();
        assert!(reporter.record_round().unwrap().is_none());
        let path = reporter.record_round().unwrap().expect("second round reports");

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Total Test Count: 2"));
        assert!(contents.contains("consensus.timeout    [Failure Count: 2]"));
        assert!(contents.contains("network.enable_tls"));
        assert!(contents.contains("Failure threshold setting: 2"));
    }
}
