// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control and observation of a single node process: start/stop/restart,
//! liveness probing, panic-log signature extraction and failure artifacts.

pub mod artifact;
pub mod liveness;
pub mod panic_log;
pub mod script;

pub use artifact::ArtifactStore;
pub use liveness::LivenessProbe;
pub use script::ScriptNodeRunner;

use std::path::Path;
use std::time::Duration;

/// Fixed post-stop quiescence delay inside `restart()`.
pub const POST_STOP_QUIESCENCE: Duration = Duration::from_secs(3);

/// Start/stop/observe one node process. Implementations must make `start`
/// and `stop` idempotent; `restart`'s default body is `stop`, sleep, `start`
/// and should not normally be overridden.
///
/// `Sync` as well as `Send`: a worker holds its runner directly behind its
/// own round-serializing mutex rather than a second lock, so the trait
/// object itself must be shareable across the threads an `Arc<Worker>` runs
/// on.
pub trait NodeRunner: Send + Sync {
    fn start(&self) -> failure::Result<()>;
    fn stop(&self) -> failure::Result<()>;
    fn is_alive(&self) -> bool;
    fn panic_log_path(&self) -> &Path;

    fn restart(&self) -> failure::Result<()> {
        self.stop()?;
        std::thread::sleep(POST_STOP_QUIESCENCE);
        let result = self.start();
        if let Err(e) = &result {
            slog_scope::error!("node failed to restart"; "error" => e.to_string());
        }
        result
    }
}

/// Test doubles shared by this crate's own tests and by downstream crates
/// (`nodefuzz-verdict`, `nodefuzz-worker`) that need a scriptable node.
/// Gated behind the `fuzzing` feature outside `#[cfg(test)]`, the same
/// opt-in test-double pattern the teacher uses (`libra-types`/
/// `libra-crypto`'s own `fuzzing` feature).
#[cfg(any(test, feature = "fuzzing"))]
pub mod fake {
    use super::NodeRunner;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Scripted `NodeRunner` double: a fixed sequence of `is_alive`
    /// responses is drained one-per-call, holding the last value once
    /// exhausted so a test doesn't need to predict every probe.
    pub struct FakeNodeRunner {
        responses: Mutex<Vec<bool>>,
        panic_log: PathBuf,
        pub start_calls: Mutex<usize>,
        pub stop_calls: Mutex<usize>,
    }

    impl FakeNodeRunner {
        pub fn new(responses: Vec<bool>) -> Self {
            FakeNodeRunner {
                responses: Mutex::new(responses),
                panic_log: PathBuf::from("/dev/null"),
                start_calls: Mutex::new(0),
                stop_calls: Mutex::new(0),
            }
        }

        pub fn with_panic_log(mut self, path: PathBuf) -> Self {
            self.panic_log = path;
            self
        }
    }

    impl NodeRunner for FakeNodeRunner {
        fn start(&self) -> failure::Result<()> {
            *self.start_calls.lock().unwrap() += 1;
            Ok(())
        }

        fn stop(&self) -> failure::Result<()> {
            *self.stop_calls.lock().unwrap() += 1;
            Ok(())
        }

        fn is_alive(&self) -> bool {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return false;
            }
            if responses.len() == 1 {
                responses[0]
            } else {
                responses.remove(0)
            }
        }

        fn panic_log_path(&self) -> &Path {
            &self.panic_log
        }
    }
}
