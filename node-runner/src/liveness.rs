// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-listing liveness check: a node is alive iff a process selector
//! (config-path substring, node name, or chain identity substring) matches
//! at least one live process, ignoring the listing command itself.

use std::process::Command;

/// A case-sensitive substring selector matched against the system process
/// listing. Constructed once per worker at `ScriptNodeRunner` build time.
#[derive(Clone, Debug)]
pub struct LivenessProbe {
    selector: String,
}

impl LivenessProbe {
    pub fn new(selector: impl Into<String>) -> Self {
        LivenessProbe {
            selector: selector.into(),
        }
    }

    /// Lists process command lines directly (no shell, no `grep` subprocess)
    /// and checks for the selector; any matching line is itself never the
    /// listing command, so there is no "exclude grep" step to get wrong.
    pub fn is_alive(&self) -> bool {
        let output = match Command::new("ps").args(&["-eo", "args="]).output() {
            Ok(out) => out,
            Err(_) => return false,
        };
        if !output.status.success() {
            return false;
        }
        let listing = String::from_utf8_lossy(&output.stdout);
        listing.lines().any(|line| line.contains(&self.selector))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unmatched_selector_reports_dead() {
        let probe = LivenessProbe::new("definitely-not-a-running-process-selector-xyz");
        assert!(!probe.is_alive());
    }
}
