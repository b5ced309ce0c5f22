// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Panic-signature extraction and per-worker deduplication.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Mutex;

lazy_static! {
    static ref HEX_ADDRESS: Regex = Regex::new(r"0x[0-9a-fA-F]+").unwrap();
    static ref HEX_OFFSET: Regex = Regex::new(r"\+0x[0-9a-fA-F]+").unwrap();
}

/// Returns the panic signature of `log`: the tail starting at the first
/// occurrence of `"panic"`, with hex addresses and `+0x<hex>` offsets
/// stripped so that two crashes at different addresses in the same code
/// path hash to the same signature. `None` if the log contains no panic.
pub fn extract_signature(log: &str) -> Option<String> {
    let start = log.find("panic")?;
    let tail = &log[start..];
    let stripped = HEX_OFFSET.replace_all(tail, "+0xN");
    let stripped = HEX_ADDRESS.replace_all(&stripped, "0xN");
    Some(stripped.into_owned())
}

/// Tracks which panic signatures a single worker has already archived, so
/// that `panic_error/` gains at most one directory per distinct signature.
#[derive(Default)]
pub struct PanicDeduper {
    seen: Mutex<HashSet<String>>,
}

impl PanicDeduper {
    pub fn new() -> Self {
        PanicDeduper::default()
    }

    /// Returns `true` the first time `signature` is seen, `false` on every
    /// repeat.
    pub fn is_new(&self, signature: &str) -> bool {
        self.seen.lock().unwrap().insert(signature.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_addresses_and_offsets() {
        let log = "note: run with RUST_BACKTRACE\nthread panicked at 0x7f1a2b3c4d5e+0x10: out of bounds";
        let sig = extract_signature(log).unwrap();
        assert!(!sig.contains("7f1a2b3c4d5e"));
        assert!(sig.contains("panicked"));
    }

    #[test]
    fn no_panic_substring_yields_none() {
        assert_eq!(extract_signature("all good, node started"), None);
    }

    #[test]
    fn deduper_reports_new_once() {
        let deduper = PanicDeduper::new();
        assert!(deduper.is_new("sig-a"));
        assert!(!deduper.is_new("sig-a"));
        assert!(deduper.is_new("sig-b"));
    }
}
