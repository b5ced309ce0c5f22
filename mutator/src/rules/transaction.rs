// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use nodefuzz_config::LeafValue;
use rand::Rng;

/// Transaction-category Tier A rules.
pub fn propose(lower_key: &str, current: &LeafValue, rng: &mut impl Rng) -> Option<LeafValue> {
    if lower_key.contains("txpool") || lower_key.contains("max_txpool_size") || lower_key.contains("limit") {
        return Some(txpool_like(current, rng));
    }
    if lower_key.contains("batch_create_timeout") || lower_key.contains("batch_timeout") {
        return Some(batch_timeout(current, rng));
    }
    if lower_key.contains("batch_max_size") || lower_key.contains("batch_size") {
        return Some(generic_doubling(current, rng));
    }
    if lower_key.contains("common_queue_num") {
        return Some(generic_doubling(current, rng));
    }
    if lower_key.contains("is_dump_txs_in_queue") {
        return Some(negated_bool(current));
    }
    if lower_key.contains("expiration") || lower_key.contains("tx_timeout") {
        return Some(tx_timeout_like(current, rng));
    }
    if lower_key.contains("tx_rate_limit") {
        return Some(tx_rate_limit(current, rng));
    }
    if lower_key.contains("send_txs_by_tree") || lower_key.contains("sync_block_by_tree") {
        return Some(negated_bool(current));
    }
    if lower_key.contains("tree_width") {
        return Some(tree_width(current, rng));
    }
    None
}

fn txpool_like(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [
        0,
        -1,
        v.saturating_mul(2),
        v.saturating_add(rng.gen_range(-5000, 5001)),
        1_000_000,
    ];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn batch_timeout(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, 1, v.saturating_mul(10), v.saturating_add(rng.gen_range(-100, 101))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn generic_doubling(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-1000, 1001))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn negated_bool(current: &LeafValue) -> LeafValue {
    match current.as_bool() {
        Some(b) => LeafValue::Bool(!b),
        None => LeafValue::Bool(true),
    }
}

fn tx_timeout_like(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [1, v.saturating_mul(10), v.saturating_add(rng.gen_range(-500, 501)), 0, -1];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn tx_rate_limit(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-1000, 1001)), 1_000_000];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn tree_width(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-5, 11))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}
