// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use nodefuzz_config::LeafValue;
use rand::Rng;

/// Consensus-category Tier A rules.
/// Markers are probed in a fixed order; first match wins.
pub fn propose(lower_key: &str, current: &LeafValue, rng: &mut impl Rng) -> Option<LeafValue> {
    if lower_key.contains("backend") {
        return Some(backend(rng));
    }
    // "path" is checked before the more specific "identity_blob_path" marker
    // further down, so any identity-blob-path key (which also contains the
    // substring "path") is actually handled here. Marker order is fixed and
    // literal, overlapping substrings and all.
    if lower_key.contains("path") {
        return Some(invalid_path(rng));
    }
    if lower_key.contains("type") {
        return Some(backend_type(rng));
    }
    if lower_key.contains("timeout") {
        return Some(timeout(current, rng));
    }
    if lower_key.contains("identity_blob_path") {
        return Some(identity_blob_path(rng));
    }
    if lower_key.contains("namespace") {
        return Some(namespace(rng));
    }
    if lower_key.contains("gas") {
        return Some(gas(current, rng));
    }
    if lower_key.contains("discovery") || lower_key.contains("enable") {
        return Some(negated_bool(current));
    }
    if lower_key.contains("snap_count") {
        return Some(snap_count(current, rng));
    }
    if lower_key.contains("min_seal_time") || lower_key.contains("ticker") {
        return Some(ticker(current, rng));
    }
    None
}

fn backend(rng: &mut impl Rng) -> LeafValue {
    let pool = [
        "vault", "in_memory", "on_disk", "invalid_backend", "__no_such_backend__",
    ];
    LeafValue::Str((*rng.choose(&pool).unwrap()).to_string())
}

fn invalid_path(rng: &mut impl Rng) -> LeafValue {
    match rng.gen_range(0, 4) {
        0 => LeafValue::Str(String::new()),
        1 => LeafValue::Null,
        2 => LeafValue::Str(format!("/tmp/test_path_{}", rng.gen_range(0, 1_000_000))),
        _ => LeafValue::Str("/nonexistent/definitely/not/there".to_string()),
    }
}

fn identity_blob_path(rng: &mut impl Rng) -> LeafValue {
    match rng.gen_range(0, 3) {
        0 => LeafValue::Null,
        1 => LeafValue::Str(format!("/tmp/test_identity_{}.yaml", rng.gen_range(0, 1_000_000))),
        _ => LeafValue::Str("/no/such/identity.yaml".to_string()),
    }
}

fn backend_type(rng: &mut impl Rng) -> LeafValue {
    let pool = ["thread", "process", "invalid_tag", "__unknown_type__"];
    LeafValue::Str((*rng.choose(&pool).unwrap()).to_string())
}

fn timeout(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().or_else(|| current.as_float().map(|f| f as i64)).unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-500, 501))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn namespace(rng: &mut impl Rng) -> LeafValue {
    match rng.gen_range(0, 4) {
        0 => LeafValue::Str("invalid_namespace".to_string()),
        1 => LeafValue::Str(String::new()),
        2 => LeafValue::Null,
        _ => LeafValue::Str(format!("namespace_{}", rng.gen_range(0, 1_000_000))),
    }
}

fn gas(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [
        0,
        -1,
        v.saturating_mul(2),
        v.saturating_add(rng.gen_range(-100_000, 100_001)),
        1_000_000_000_000_000_000,
    ];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn negated_bool(current: &LeafValue) -> LeafValue {
    match current.as_bool() {
        Some(b) => LeafValue::Bool(!b),
        None => LeafValue::Bool(true),
    }
}

fn snap_count(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(1);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-500, 501))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn ticker(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_float().or_else(|| current.as_int().map(|i| i as f64)).unwrap_or(1.0);
    let pool = [0.0, 0.01, v * 2.0, v + rng.gen_range(-1.0, 5.0)];
    LeafValue::Float(*rng.choose(&pool).unwrap())
}
