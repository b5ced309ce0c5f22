// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide shared memory of which (key, value) mutations have been
//! observed to crash or survive a node, plus the derived "consistent" /
//! "inconsistent" key classifications. One instance is created by the
//! orchestrator at startup and cloned (cheaply, via `Arc`) into every
//! worker and the reporter.

use nodefuzz_config::LeafValue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Default failure count at which a key is promoted into `consistent_items`.
pub const CONSISTENT_THRESHOLD: usize = 10;

/// A value that can populate the failure/success sets: either an ordinary
/// leaf value or the distinguished "this key was deleted" sentinel.
///
/// Kept distinct from `LeafValue` rather than folded into it as a variant:
/// a tree leaf can legitimately hold a `LeafValue::Null` (a config's own
/// empty value), and collapsing deletion into the same enum would make
/// "the key was removed" indistinguishable from "the key is present and
/// null" inside `failure_set`/`success_set`.
#[derive(Clone, Debug, PartialEq)]
pub enum Candidate {
    Value(LeafValue),
    Delete,
}

impl From<LeafValue> for Candidate {
    fn from(value: LeafValue) -> Self {
        Candidate::Value(value)
    }
}

#[derive(Default)]
struct KbInner {
    failure_set: HashMap<String, Vec<Candidate>>,
    success_set: HashMap<String, Vec<Candidate>>,
    failure_count: HashMap<String, usize>,
    consistent_items: HashSet<String>,
    inconsistent_items: HashSet<String>,
}

/// A point-in-time, owned copy of the parts of the knowledge base the
/// reporter renders. Never borrows the lock across a report write.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// `(key, failure_count)` pairs for every member of `consistent_items`.
    pub consistent: Vec<(String, usize)>,
    pub inconsistent: Vec<String>,
    pub threshold: usize,
}

/// Cheap-to-clone handle to the shared failure/success memory. All methods
/// take `&self`; interior mutability is a single `RwLock`.
#[derive(Clone)]
pub struct KnowledgeBase {
    inner: Arc<RwLock<KbInner>>,
    threshold: usize,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::with_threshold(CONSISTENT_THRESHOLD)
    }

    pub fn with_threshold(threshold: usize) -> Self {
        KnowledgeBase {
            inner: Arc::new(RwLock::new(KbInner::default())),
            threshold,
        }
    }

    /// Adds `value` to `failure_set[key]`, increments `failure_count[key]`,
    /// and promotes `key` into `consistent_items` once the count reaches
    /// the threshold.
    pub fn record_failure(&self, key: &str, value: Candidate) {
        let mut inner = self.inner.write().unwrap();
        let set = inner.failure_set.entry(key.to_string()).or_insert_with(Vec::new);
        if !set.contains(&value) {
            set.push(value);
        }
        let count = inner.failure_count.entry(key.to_string()).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            inner.consistent_items.insert(key.to_string());
        }
    }

    /// Adds `value` to `success_set[key]`, marks `key` tolerant, and clears
    /// any prior "must be consistent" classification for it.
    pub fn record_success(&self, key: &str, value: Candidate) {
        let mut inner = self.inner.write().unwrap();
        let set = inner.success_set.entry(key.to_string()).or_insert_with(Vec::new);
        if !set.contains(&value) {
            set.push(value);
        }
        inner.inconsistent_items.insert(key.to_string());
        inner.consistent_items.remove(key);
    }

    pub fn is_known_failure(&self, key: &str, value: &Candidate) -> bool {
        let inner = self.inner.read().unwrap();
        inner
            .failure_set
            .get(key)
            .map(|set| set.contains(value))
            .unwrap_or(false)
    }

    pub fn is_known_success(&self, key: &str, value: &Candidate) -> bool {
        let inner = self.inner.read().unwrap();
        inner
            .success_set
            .get(key)
            .map(|set| set.contains(value))
            .unwrap_or(false)
    }

    pub fn is_consistent(&self, key: &str) -> bool {
        self.inner.read().unwrap().consistent_items.contains(key)
    }

    pub fn failure_count(&self, key: &str) -> usize {
        self.inner
            .read()
            .unwrap()
            .failure_count
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Owned snapshot for the reporter; sorted for deterministic output.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().unwrap();
        let mut consistent: Vec<(String, usize)> = inner
            .consistent_items
            .iter()
            .map(|k| (k.clone(), inner.failure_count.get(k).copied().unwrap_or(0)))
            .collect();
        consistent.sort_by(|a, b| a.0.cmp(&b.0));
        let mut inconsistent: Vec<String> = inner.inconsistent_items.iter().cloned().collect();
        inconsistent.sort();
        Snapshot {
            consistent,
            inconsistent,
            threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn threshold_crossing_promotes_key() {
        let kb = KnowledgeBase::with_threshold(3);
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(0)));
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(-1)));
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(99999)));
        assert!(kb.is_consistent("consensus.timeout"));
        assert_eq!(kb.failure_count("consensus.timeout"), 3);
    }

    #[test]
    fn success_clears_consistency_flag() {
        let kb = KnowledgeBase::with_threshold(3);
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(0)));
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(-1)));
        kb.record_failure("consensus.timeout", Candidate::Value(LeafValue::Int(99999)));
        assert!(kb.is_consistent("consensus.timeout"));
        kb.record_success("consensus.timeout", Candidate::Value(LeafValue::Int(12345)));
        assert!(!kb.is_consistent("consensus.timeout"));
        assert!(kb.is_known_success("consensus.timeout", &Candidate::Value(LeafValue::Int(12345))));
    }

    #[test]
    fn delete_sentinel_is_tracked_independently_of_null() {
        let kb = KnowledgeBase::new();
        kb.record_failure("storage.path", Candidate::Delete);
        assert!(kb.is_known_failure("storage.path", &Candidate::Delete));
        assert!(!kb.is_known_failure("storage.path", &Candidate::Value(LeafValue::Null)));
    }

    #[test]
    fn unknown_key_reports_no_known_values() {
        let kb = KnowledgeBase::new();
        assert!(!kb.is_known_failure("never.seen", &Candidate::Value(LeafValue::Bool(true))));
        assert!(!kb.is_known_success("never.seen", &Candidate::Value(LeafValue::Bool(true))));
    }
}
