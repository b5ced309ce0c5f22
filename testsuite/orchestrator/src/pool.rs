// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Worker pool submission/resubmission loop: a fixed-size `threadpool` of
//! size `N` (one slot per node), each slot forever re-submitting its
//! worker's `round()` the instant the previous one completes. No future is
//! ever joined; the pool drains only when the process exits.
//!
//! This is the Rust analogue of `MultinodeFuzzer.fuzz()`'s
//! `ThreadPoolExecutor` + `as_completed` + immediate-resubmit loop in
//! `new_rule_guided_config_fuzz.py`, corrected per spec.md §7: an
//! uncaught `round()` error or panic is logged but the worker is still
//! re-submitted (the original's `except` branch drops the task instead).

use crate::reporter::Reporter;
use nodefuzz_worker::Worker;
use rand::rngs::StdRng;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use threadpool::ThreadPool;

/// Submits `worker`'s first round onto `pool`. Each completed round
/// re-submits itself, so after this call returns the worker runs forever.
pub fn spawn(pool: &ThreadPool, worker: Arc<Worker<StdRng>>, reporter: Arc<Reporter>) {
    let pool_handle = pool.clone();
    pool.execute(move || run_round(pool_handle, worker, reporter));
}

fn run_round(pool: ThreadPool, worker: Arc<Worker<StdRng>>, reporter: Arc<Reporter>) {
    match panic::catch_unwind(AssertUnwindSafe(|| worker.round())) {
        Ok(Ok(outcome)) => {
            slog_scope::info!(
                "round completed";
                "worker" => outcome.worker.as_str(),
                "key" => outcome.key.as_str(),
                "classification" => format!("{:?}", outcome.classification),
            );
            if let Err(e) = reporter.record_round() {
                slog_scope::warn!("failed to write knowledge-base report"; "error" => e.to_string());
            }
        }
        Ok(Err(e)) => {
            slog_scope::error!(
                "round returned an error, worker will be re-submitted";
                "worker" => worker.name(),
                "error" => e.to_string(),
            );
        }
        Err(payload) => {
            slog_scope::error!(
                "round panicked, worker will be re-submitted";
                "worker" => worker.name(),
                "panic" => panic_message(&payload),
            );
        }
    }
    spawn(&pool, worker, reporter);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
