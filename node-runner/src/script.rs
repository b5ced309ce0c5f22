// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Production `NodeRunner`: shells out to a pair of generated or supplied
//! `start.sh`/`stop.sh` scripts living under the worker's directory.

use crate::liveness::LivenessProbe;
use crate::NodeRunner;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct ScriptNodeRunner {
    start_script: PathBuf,
    stop_script: PathBuf,
    panic_log: PathBuf,
    liveness: LivenessProbe,
}

impl ScriptNodeRunner {
    /// `worker_dir` must contain `start.sh` and `stop.sh`; both are made
    /// executable here rather than relying on the caller's umask.
    /// `liveness_selector` is the process-listing substring identifying
    /// this worker's node (config-path substring, node name, or chain
    /// identity substring).
    pub fn new(worker_dir: &Path, liveness_selector: impl Into<String>) -> failure::Result<Self> {
        let start_script = worker_dir.join("start.sh");
        let stop_script = worker_dir.join("stop.sh");
        make_executable(&start_script)?;
        make_executable(&stop_script)?;
        Ok(ScriptNodeRunner {
            start_script,
            stop_script,
            panic_log: worker_dir.join("node.log"),
            liveness: LivenessProbe::new(liveness_selector),
        })
    }
}

impl NodeRunner for ScriptNodeRunner {
    fn start(&self) -> failure::Result<()> {
        slog_scope::debug!("starting node"; "script" => self.start_script.to_string_lossy().into_owned());
        run_script(&self.start_script)
    }

    fn stop(&self) -> failure::Result<()> {
        slog_scope::debug!("stopping node"; "script" => self.stop_script.to_string_lossy().into_owned());
        run_script(&self.stop_script)
    }

    fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    fn panic_log_path(&self) -> &Path {
        &self.panic_log
    }
}

/// `chmod 755`, the equivalent of the source's `os.system('chmod 777 ...')`
/// done without shelling out to `chmod`.
fn make_executable(path: &Path) -> failure::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Runs the script to completion. Exit status is not consulted; the only
/// observable effect is through `is_alive()` and the node log.
fn run_script(path: &Path) -> failure::Result<()> {
    Command::new(path).status()?;
    Ok(())
}
