// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! One node's share of the distributed fuzz loop: select a base config from
//! the worker's own pool, generate a candidate mutation guided by the shared
//! [`KnowledgeBase`] and this worker's role, drive it through the verdict
//! engine, then fold the outcome back into the pool and the knowledge base.
//!
//! A single [`Worker`] is built once per node by the orchestrator and handed
//! to the thread pool; `round()` is the unit that gets submitted and
//! re-submitted. All state a round touches beyond the shared `KnowledgeBase`
//! lives behind the worker's own mutex, so rounds for one worker are strictly
//! sequential while sibling workers run in parallel.

use failure::bail;
use nodefuzz_config::{Category, CategoryMap, ConfigStore, ConfigTree, LeafKind, LeafValue};
use nodefuzz_kb::{Candidate, KnowledgeBase};
use nodefuzz_mutator::Mutator;
use nodefuzz_node::panic_log::PanicDeduper;
use nodefuzz_node::{ArtifactStore, NodeRunner};
use nodefuzz_verdict::{self, Classification, RestartMutex, VerdictConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Bounded retry count shared by the two role-guided redraws in `round()`:
/// rejecting a mutator candidate already known to fail (or, for exploration,
/// already known to succeed), and rejecting a consistency-flagged key drawn
/// by the fuzzing role.
pub const WORKER_RETRY_BOUND: usize = 5;

/// Probability (as a percent, matching this workspace's `gen_range(0, 100)`
/// idiom for weighted choices) that the fuzzing role rejects and redraws a
/// key currently in `consistent_items`.
pub const CONSISTENT_REDRAW_PERCENT: u32 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Avoids known failures, may revisit known successes.
    Fuzzing,
    /// Avoids both known failures and known successes (novel mutations only).
    Exploration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Change,
    Delete,
}

/// Outcome of one completed round, returned to the orchestrator purely for
/// logging/report-cadence bookkeeping; the knowledge base has already been
/// updated by the time this is returned.
#[derive(Clone, Debug)]
pub struct RoundOutcome {
    pub worker: String,
    pub key: String,
    pub candidate: Candidate,
    pub classification: Classification,
}

struct WorkerState<R: Rng> {
    config_pool: Vec<ConfigTree>,
    rounds_completed: u64,
    rng: R,
    mutator: Mutator<R>,
}

/// One node's worker: owns its config pool, its node process, and its own
/// results directory. Cheaply `Arc`-shareable pieces (knowledge base,
/// category map, restart mutex) are injected so siblings share them.
pub struct Worker<R: Rng = StdRng> {
    name: String,
    role: Role,
    category_map: Arc<CategoryMap>,
    kb: KnowledgeBase,
    store: ConfigStore,
    runner: Box<dyn NodeRunner>,
    artifacts: ArtifactStore,
    dedup: PanicDeduper,
    restart_mutex: Arc<RestartMutex>,
    verdict_config: VerdictConfig,
    state: Mutex<WorkerState<R>>,
}

impl Worker<StdRng> {
    /// Builds a worker seeded with the initial config tree and an
    /// entropy-seeded RNG, the production configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        role: Role,
        category_map: Arc<CategoryMap>,
        kb: KnowledgeBase,
        store: ConfigStore,
        initial_tree: ConfigTree,
        runner: Box<dyn NodeRunner>,
        artifacts: ArtifactStore,
        restart_mutex: Arc<RestartMutex>,
        verdict_config: VerdictConfig,
    ) -> Self {
        Worker {
            name: name.into(),
            role,
            category_map,
            kb,
            store,
            runner,
            artifacts,
            dedup: PanicDeduper::new(),
            restart_mutex,
            verdict_config,
            state: Mutex::new(WorkerState {
                config_pool: vec![initial_tree],
                rounds_completed: 0,
                rng: StdRng::from_entropy(),
                mutator: Mutator::with_rng(StdRng::from_entropy()),
            }),
        }
    }
}

impl<R: Rng> Worker<R> {
    /// Test/deterministic-replay constructor: caller supplies the RNGs
    /// driving both the worker's own draws (base/mode/key selection) and the
    /// mutator's candidate proposals.
    #[allow(clippy::too_many_arguments)]
    pub fn with_rng(
        name: impl Into<String>,
        role: Role,
        category_map: Arc<CategoryMap>,
        kb: KnowledgeBase,
        store: ConfigStore,
        initial_tree: ConfigTree,
        runner: Box<dyn NodeRunner>,
        artifacts: ArtifactStore,
        restart_mutex: Arc<RestartMutex>,
        verdict_config: VerdictConfig,
        rng: R,
        mutator: Mutator<R>,
    ) -> Self {
        Worker {
            name: name.into(),
            role,
            category_map,
            kb,
            store,
            runner,
            artifacts,
            dedup: PanicDeduper::new(),
            restart_mutex,
            verdict_config,
            state: Mutex::new(WorkerState {
                config_pool: vec![initial_tree],
                rounds_completed: 0,
                rng,
                mutator,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Number of config snapshots currently in this worker's pool (grows by
    /// exactly one on every survived round, never shrinks).
    pub fn pool_len(&self) -> usize {
        self.state.lock().unwrap().config_pool.len()
    }

    pub fn rounds_completed(&self) -> u64 {
        self.state.lock().unwrap().rounds_completed
    }

    /// Runs one full round: select base, pick a candidate mutation guided by
    /// role and knowledge base, commit/restart/probe via the verdict engine,
    /// then fold the classification back into the pool and knowledge base.
    pub fn round(&self) -> failure::Result<RoundOutcome> {
        let mut state = self.state.lock().unwrap();

        let base_idx = state.rng.gen_range(0, state.config_pool.len());
        let mut new_tree = state.config_pool[base_idx].clone();

        let mode = if state.rng.gen_range(0, 2) == 0 {
            Mode::Change
        } else {
            Mode::Delete
        };

        let mut key = pick_key(&new_tree, &mut state.rng, true)?;
        if self.role == Role::Fuzzing {
            for _ in 0..WORKER_RETRY_BOUND {
                if !self.kb.is_consistent(&key) {
                    break;
                }
                if state.rng.gen_range(0, 100) >= CONSISTENT_REDRAW_PERCENT {
                    break;
                }
                key = pick_key(&new_tree, &mut state.rng, true)?;
            }
        }

        let delete_is_known_failure =
            mode == Mode::Delete && self.kb.is_known_failure(&key, &Candidate::Delete);

        let (final_key, candidate) = if mode == Mode::Change || delete_is_known_failure {
            let current = new_tree.get(&key).cloned().unwrap_or(LeafValue::Null);
            let category: Category = new_tree.category_of(&key, &self.category_map);
            let kind = current.kind();
            let pool = new_tree.values_of_kind(kind);

            let mut chosen: Option<LeafValue> = None;
            for _ in 0..WORKER_RETRY_BOUND {
                let proposed = match state.mutator.mutate(&key, &current, category, &pool) {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let rejected = match self.role {
                    Role::Fuzzing => self
                        .kb
                        .is_known_failure(&key, &Candidate::Value(proposed.clone())),
                    Role::Exploration => {
                        self.kb
                            .is_known_failure(&key, &Candidate::Value(proposed.clone()))
                            || self
                                .kb
                                .is_known_success(&key, &Candidate::Value(proposed.clone()))
                    }
                };
                if !rejected {
                    chosen = Some(proposed);
                    break;
                }
            }

            let value = chosen.unwrap_or_else(|| {
                new_tree.origin_value(&key).cloned().unwrap_or(LeafValue::Null)
            });
            new_tree.set(&key, value.clone());
            (key, Candidate::Value(value))
        } else {
            let fresh_key = pick_key(&new_tree, &mut state.rng, false)?;
            new_tree.delete(&fresh_key);
            (fresh_key, Candidate::Delete)
        };

        let classification = nodefuzz_verdict::evaluate(
            &self.verdict_config,
            &self.restart_mutex,
            &self.store,
            &new_tree,
            self.runner.as_ref(),
            &self.artifacts,
            &self.dedup,
        )?;

        match classification {
            Classification::Survived => {
                self.kb.record_success(&final_key, candidate.clone());
                state.config_pool.push(new_tree);
            }
            Classification::StartupFailure | Classification::RuntimeFailure => {
                self.kb.record_failure(&final_key, candidate.clone());
            }
        }
        state.rounds_completed += 1;
        slog_scope::debug!(
            "round drew a candidate";
            "worker" => self.name.as_str(),
            "key" => final_key.as_str(),
            "rounds_completed" => state.rounds_completed,
        );

        Ok(RoundOutcome {
            worker: self.name.clone(),
            key: final_key,
            candidate,
            classification,
        })
    }
}

/// Uniformly draws one key from `tree`. `skip_list` excludes list-typed
/// leaves from the draw; the fresh key picked for an actual delete is drawn
/// unconstrained ("in some dialects" a list leaf is as deletable as any
/// other).
fn pick_key(tree: &ConfigTree, rng: &mut impl Rng, skip_list: bool) -> failure::Result<String> {
    let keys: Vec<&str> = tree
        .all_keys()
        .into_iter()
        .filter(|k| !skip_list || tree.kind_of(k) != Some(LeafKind::List))
        .collect();
    if keys.is_empty() {
        bail!("no eligible keys to draw a mutation candidate from");
    }
    let idx = rng.gen_range(0, keys.len());
    Ok(keys[idx].to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use nodefuzz_node::fake::FakeNodeRunner;
    use rand::SeedableRng;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_verdict_config() -> VerdictConfig {
        VerdictConfig {
            post_restart_delay: Duration::from_millis(1),
            run_time_for_crash: Duration::from_millis(5),
            check_times: 5,
        }
    }

    fn store_with(dir: &std::path::Path, contents: &str) -> (ConfigStore, ConfigTree) {
        let path = dir.join("node.toml");
        fs::write(&path, contents).unwrap();
        let store = ConfigStore::open(&path).unwrap();
        let tree = store.load().unwrap();
        (store, tree)
    }

    fn build_worker(
        dir: &std::path::Path,
        role: Role,
        contents: &str,
        alive: Vec<bool>,
    ) -> Worker<rand::rngs::StdRng> {
        let (store, tree) = store_with(dir, contents);
        let runner = Box::new(FakeNodeRunner::new(alive));
        let artifacts = ArtifactStore::new(dir, "worker-test").unwrap();
        Worker::with_rng(
            "worker-test",
            role,
            Arc::new(CategoryMap::default()),
            KnowledgeBase::new(),
            store,
            tree,
            runner,
            artifacts,
            Arc::new(Mutex::new(())),
            fast_verdict_config(),
            rand::rngs::StdRng::seed_from_u64(1),
            Mutator::with_rng(rand::rngs::StdRng::seed_from_u64(1)),
        )
    }

    #[test]
    fn survived_round_grows_pool_by_exactly_one() {
        let dir = tempdir().unwrap();
        let worker = build_worker(dir.path(), Role::Fuzzing, "enable_tls = true\n", vec![true]);
        assert_eq!(worker.pool_len(), 1);
        let outcome = worker.round().unwrap();
        assert_eq!(outcome.classification, Classification::Survived);
        assert_eq!(worker.pool_len(), 2);
        assert_eq!(worker.rounds_completed(), 1);
    }

    #[test]
    fn failed_round_leaves_pool_unchanged() {
        let dir = tempdir().unwrap();
        let worker = build_worker(dir.path(), Role::Fuzzing, "enable_tls = true\n", vec![false]);
        assert_eq!(worker.pool_len(), 1);
        let outcome = worker.round().unwrap();
        assert_eq!(outcome.classification, Classification::StartupFailure);
        assert_eq!(worker.pool_len(), 1);
        assert_eq!(worker.rounds_completed(), 1);
    }

    #[test]
    fn exploration_role_never_revisits_a_known_success() {
        let dir = tempdir().unwrap();
        let worker = build_worker(
            dir.path(),
            Role::Exploration,
            "enable_tls = true\n",
            vec![true],
        );
        worker.kb().record_success("enable_tls", Candidate::Value(LeafValue::Bool(false)));
        let outcome = worker.round().unwrap();
        // Only two booleans exist; if the round took the change path, the
        // known success (`false`) must be rejected, leaving the only other
        // boolean (`true`, also the pristine fallback) as the candidate. A
        // delete-mode round draws no value at all, so it trivially satisfies
        // the same invariant.
        match outcome.candidate {
            Candidate::Value(LeafValue::Bool(b)) => assert!(b),
            Candidate::Value(other) => panic!("unexpected leaf kind: {:?}", other),
            Candidate::Delete => {}
        }
    }

    #[test]
    fn exhaustion_fallback_applies_the_pristine_value_and_still_restarts() {
        let dir = tempdir().unwrap();
        let worker = build_worker(dir.path(), Role::Fuzzing, "enable_tls = true\n", vec![false]);
        // Tier B's bool rule is a plain negation, so every one of the
        // mutator's candidates for this key is the same value (`false`).
        // Recording that single possible candidate as a known failure (for
        // both the change and delete-known-failure paths) forces every
        // retry in `round()` to be rejected regardless of which mode gets
        // drawn, so the fallback to the pristine snapshot value is the only
        // way the round can proceed.
        worker.kb().record_failure("enable_tls", Candidate::Value(LeafValue::Bool(false)));
        worker.kb().record_failure("enable_tls", Candidate::Delete);

        let outcome = worker.round().unwrap();

        assert_eq!(outcome.key, "enable_tls");
        assert_eq!(outcome.candidate, Candidate::Value(LeafValue::Bool(true)));
        assert_eq!(outcome.classification, Classification::StartupFailure);
        // The fallback is a no-op relative to the original file; the round
        // still exercises the restart pipeline and is classified normally.
        assert_eq!(worker.pool_len(), 1);
    }

    impl<R: Rng> Worker<R> {
        fn kb(&self) -> &KnowledgeBase {
            &self.kb
        }
    }
}
