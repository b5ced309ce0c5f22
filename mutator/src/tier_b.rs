// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tier B: generic type-based fallback mutation, used when no Tier A
//! name marker matched.

use nodefuzz_config::LeafValue;
use rand::Rng;

pub fn propose(current: &LeafValue, rng: &mut impl Rng, same_type_pool: &[&LeafValue]) -> LeafValue {
    match current {
        LeafValue::Bool(b) => LeafValue::Bool(!b),
        LeafValue::Int(v) => mutate_int(*v, rng),
        LeafValue::Float(v) => mutate_float(*v, rng),
        LeafValue::Str(s) => mutate_string(s, rng),
        LeafValue::List(items) => mutate_list(items, rng),
        LeafValue::Map(map) => mutate_map(map, rng),
        LeafValue::Null => mutate_other(same_type_pool, rng),
    }
}

fn mutate_int(v: i64, rng: &mut impl Rng) -> LeafValue {
    let offset = v.saturating_add(rng.gen_range(-500, 501));
    let pool = [0i64, -1, 99_999, offset];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn mutate_float(v: f64, rng: &mut impl Rng) -> LeafValue {
    let scaled = v * rng.gen_range(0.1, 10.0);
    let random_range = (rng.gen_range(-1000.0, 1000.0) * 1000.0).round() / 1000.0;
    let pool = [0.0, -1.0, scaled, random_range];
    LeafValue::Float(*rng.choose(&pool).unwrap())
}

fn mutate_string(s: &str, rng: &mut impl Rng) -> LeafValue {
    // A small chance of a bogus path/URL, the same low-probability extra
    // the originals mix into their string candidate pools (SPEC_FULL §4.2
    // supplement).
    if rng.gen_range(0, 100) < 10 {
        let bogus = ["www.example-bogus-host.test", "/awfawjfo/dawf", "~/awfawf"];
        return LeafValue::Str((*rng.choose(&bogus).unwrap()).to_string());
    }
    let reversed: String = s.chars().rev().collect();
    let mutated = format!("{}_mutated", s);
    let choices = [reversed, mutated, "invalid_string".to_string(), String::new()];
    if rng.gen_range(0, 5) == 0 {
        LeafValue::Null
    } else {
        LeafValue::Str(rng.choose(&choices).unwrap().clone())
    }
}

fn mutate_list(items: &[LeafValue], rng: &mut impl Rng) -> LeafValue {
    match rng.gen_range(0, 3) {
        0 => {
            let mut extended = items.to_vec();
            extended.push(LeafValue::Str("invalid_entry".to_string()));
            LeafValue::List(extended)
        }
        1 => {
            let mut resampled = items.to_vec();
            if let Some(sample) = items.first() {
                resampled.push(sample.clone());
            }
            LeafValue::List(resampled)
        }
        _ => LeafValue::List(Vec::new()),
    }
}

fn mutate_map(map: &std::collections::BTreeMap<String, LeafValue>, rng: &mut impl Rng) -> LeafValue {
    if rng.gen_range(0, 2) == 0 {
        let mut extended = map.clone();
        extended.insert("invalid_key".to_string(), LeafValue::Str("invalid_value".to_string()));
        LeafValue::Map(extended)
    } else {
        LeafValue::Map(std::collections::BTreeMap::new())
    }
}

fn mutate_other(same_type_pool: &[&LeafValue], rng: &mut impl Rng) -> LeafValue {
    if let Some(sample) = rng.choose(same_type_pool) {
        (*sample).clone()
    } else if rng.gen_range(0, 2) == 0 {
        LeafValue::Str("null".to_string())
    } else {
        LeafValue::Int(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn bool_is_always_negated() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert_eq!(propose(&LeafValue::Bool(true), &mut rng, &[]), LeafValue::Bool(false));
        assert_eq!(propose(&LeafValue::Bool(false), &mut rng, &[]), LeafValue::Bool(true));
    }

    #[test]
    fn list_mutation_never_returns_the_identical_vec_instance() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let items = vec![LeafValue::Int(1), LeafValue::Int(2)];
        for _ in 0..10 {
            let candidate = mutate_list(&items, &mut rng);
            if let LeafValue::List(out) = candidate {
                assert!(out.len() != items.len() || out != items);
            } else {
                panic!("expected list");
            }
        }
    }
}
