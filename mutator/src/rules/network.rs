// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

use nodefuzz_config::LeafValue;
use rand::Rng;

/// Network-category Tier A rules.
pub fn propose(lower_key: &str, current: &LeafValue, rng: &mut impl Rng) -> Option<LeafValue> {
    if lower_key.contains("port") {
        return Some(port(current, rng));
    }
    if lower_key.contains("address") || lower_key.contains("addr")
        || lower_key.contains("listen_ip") || lower_key.contains("bind_ip")
    {
        return Some(address(rng));
    }
    if lower_key.contains("seeds") || lower_key.contains("peers") {
        return Some(list_perturbation(current, rng));
    }
    if lower_key.contains("rate_limit") || lower_key.contains("max_connection") {
        return Some(generic_limit(current, rng));
    }
    if lower_key.contains("ping_interval") {
        return Some(ping_interval(current, rng));
    }
    if lower_key.contains("buffer_size_bytes") {
        return Some(buffer_size(current, rng));
    }
    // "tls" here shadows the more specific "key"/"cert" path marker listed
    // after it — a tls-named boolean flag is negated rather than treated
    // as a path, matching the fixed marker order.
    if lower_key.contains("ssl") || lower_key.contains("tls") || lower_key.contains("enable")
        || lower_key.contains("compression") || lower_key.contains("sm_ssl")
    {
        return Some(negated_bool(current));
    }
    if lower_key.contains("key") || lower_key.contains("cert") {
        return Some(invalid_path(rng));
    }
    None
}

fn port(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, 65536, v.saturating_add(rng.gen_range(-100, 101)), rng.gen_range(1, 65536)];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn address(rng: &mut impl Rng) -> LeafValue {
    let pool = [
        "999.999.999.999".to_string(),
        "not-an-ip".to_string(),
        format!("192.168.{}.{}:{}", rng.gen_range(0, 256), rng.gen_range(0, 256), rng.gen_range(1, 65536)),
    ];
    LeafValue::Str(rng.choose(&pool).unwrap().clone())
}

fn list_perturbation(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let items = match current {
        LeafValue::List(items) => items.clone(),
        _ => Vec::new(),
    };
    match rng.gen_range(0, 3) {
        0 => {
            let mut extended = items;
            extended.push(LeafValue::Str("invalid_peer".to_string()));
            LeafValue::List(extended)
        }
        1 => {
            let mut truncated = items;
            truncated.pop();
            LeafValue::List(truncated)
        }
        _ => LeafValue::List(Vec::new()),
    }
}

fn generic_limit(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-1000, 1001))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn ping_interval(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, 1, v.saturating_mul(10), v.saturating_add(rng.gen_range(-1000, 1001))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn buffer_size(current: &LeafValue, rng: &mut impl Rng) -> LeafValue {
    let v = current.as_int().unwrap_or(0);
    let pool = [0, -1, v.saturating_mul(2), v.saturating_add(rng.gen_range(-1024, 1025))];
    LeafValue::Int(*rng.choose(&pool).unwrap())
}

fn negated_bool(current: &LeafValue) -> LeafValue {
    match current.as_bool() {
        Some(b) => LeafValue::Bool(!b),
        None => LeafValue::Bool(true),
    }
}

fn invalid_path(rng: &mut impl Rng) -> LeafValue {
    let pool = ["/no/such/cert.pem", "/no/such/key.pem", ""];
    LeafValue::Str((*rng.choose(&pool).unwrap()).to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn port_marker_produces_int() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let result = propose("network.listen_port", &LeafValue::Int(6180), &mut rng);
        assert!(matches!(result, Some(LeafValue::Int(_))));
    }

    #[test]
    fn tls_marker_negates_rather_than_path() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let result = propose("network.tls_enabled", &LeafValue::Bool(true), &mut rng);
        assert_eq!(result, Some(LeafValue::Bool(false)));
    }
}
