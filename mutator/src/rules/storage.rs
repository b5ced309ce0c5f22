// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use nodefuzz_config::LeafValue;
use rand::Rng;

/// Storage-category Tier A rules.
pub fn propose(lower_key: &str, current: &LeafValue, rng: &mut impl Rng) -> Option<LeafValue> {
    if lower_key.contains("path") || lower_key.contains("store_path") || lower_key.contains("db_path") {
        return Some(invalid_path(rng));
    }
    if lower_key.contains("backup_service_address") {
        return Some(invalid_address(rng));
    }
    if lower_key.contains("max_frame_size") || lower_key.contains("max_message_size")
        || lower_key.contains("write_buffer_size") || lower_key.contains("cache_size")
    {
        return Some(generic_size(current, rng));
    }
    if lower_key.contains("timeout") || lower_key.contains("interval") {
        return Some(generic_interval(current, rng));
    }
    if lower_key.contains("provider") {
        return Some(provider(rng));
    }
    if lower_key.contains("compression") || lower_key.contains("disable") || lower_key.contains("enable") {
        return Some(negated_or_invalid(current, rng));
    }
    if lower_key.contains("max_open_files") {
        return Some(generic_size(current, rng));
    }
    None
}

fn invalid_path(rng: &mut impl Rng) -> LeafValue {
    match rng.gen_range(0, 3) {
        0 => LeafValue::Str(String::new()),
        1 => LeafValue::Null,
        _ => LeafValue::Str(format!("/tmp/test_path_{}", rng.gen_range(0, 1_000_000))),
    }
}

fn invalid_address(rng: &mut impl Rng) -> LeafValue {
    let pool = [
        "256.256.256.256:0".to_string(),
        "not-a-host:not-a-port".to_string(),
        format!("backup-host-{}.internal:{}", rng.gen_range(0, 1000), rng.gen_range(1, 65536)),
    ];
    LeafValue::Str(rng.choose(&pool).unwrap().clone())
}

fn generic_size(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-1024, 1025))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn generic_interval(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, 1, v.saturating_mul(10), v.saturating_add(rng.gen_range(-1000, 1001))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn provider(rng: &mut impl Rng) -> LeafValue {
    let pool = ["rocksdb", "in_memory", "invalid_provider", "__no_such_provider__"];
    LeafValue::Str((*rng.choose(&pool).unwrap()).to_string())
}

fn negated_or_invalid(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    match current.as_bool() {
        Some(b) => LeafValue::Bool(!b),
        None => LeafValue::Str(
            (*rng.choose(&["invalid_tag", "__unknown__"]).unwrap()).to_string(),
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn db_path_marker_wins() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let result = propose("storage.db_path", &LeafValue::Str("/var/data".into()), &mut rng);
        assert!(result.is_some());
    }

    #[test]
    fn cache_size_is_generic_int_mutation() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let result = propose("storage.cache_size", &LeafValue::Int(4096), &mut rng);
        assert!(matches!(result, Some(LeafValue::Int(_))));
    }
}
