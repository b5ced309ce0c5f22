// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Produces a mutated value for a `(key, current_value)` pair using
//! type- and name-based rules.
//!
//! Rule selection is two-tiered: Tier A inspects the lowercased key for
//! category-specific substring markers (`rules::consensus`, `::network`,
//! `::storage`, `::transaction`); Tier B is a generic type-based fallback
//! (`tier_b`) used when no marker matched, or for `Category::Other`.

mod rules;
mod tier_b;

use failure::Fail;
use nodefuzz_config::{Category, LeafValue};
use rand::rngs::ThreadRng;
use rand::Rng;

/// The mutator could not produce a value distinct from the current one
/// within the inner retry bound.
#[derive(Debug, Fail)]
#[fail(display = "mutator exhausted {} retries for key {:?} without a distinct candidate", retries, key)]
pub struct MutationExhausted {
    pub key: String,
    pub retries: usize,
}

/// Bounded retry count for a single `mutate` call rejecting candidates
/// equal to the current value (at least 5 attempts).
pub const INNER_RETRY_BOUND: usize = 5;

pub struct Mutator<R: Rng = ThreadRng> {
    rng: R,
}

impl Mutator<ThreadRng> {
    pub fn new() -> Self {
        Mutator { rng: rand::thread_rng() }
    }
}

impl Default for Mutator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Mutator<R> {
    pub fn with_rng(rng: R) -> Self {
        Mutator { rng }
    }

    /// Produces a value distinct from `current`, or `MutationExhausted`
    /// after `INNER_RETRY_BOUND` rejected candidates.
    ///
    /// `same_type_pool` is the tree's current set of values sharing
    /// `current`'s type (the original's `type_to_values_map`), used as
    /// extra Tier B candidate material.
    pub fn mutate(
        &mut self,
        key: &str,
        current: &LeafValue,
        category: Category,
        same_type_pool: &[&LeafValue],
    ) -> Result<LeafValue, MutationExhausted> {
        for _ in 0..INNER_RETRY_BOUND {
            let candidate = self.propose(key, current, category, same_type_pool);
            if &candidate != current {
                return Ok(candidate);
            }
        }
        Err(MutationExhausted {
            key: key.to_string(),
            retries: INNER_RETRY_BOUND,
        })
    }

    fn propose(
        &mut self,
        key: &str,
        current: &LeafValue,
        category: Category,
        same_type_pool: &[&LeafValue],
    ) -> LeafValue {
        let lower = key.to_lowercase();
        let tier_a = match category {
            Category::Consensus => rules::consensus::propose(&lower, current, &mut self.rng),
            Category::Network => rules::network::propose(&lower, current, &mut self.rng),
            Category::Storage => rules::storage::propose(&lower, current, &mut self.rng),
            Category::Transaction => rules::transaction::propose(&lower, current, &mut self.rng),
            Category::Other => None,
        };
        tier_a.unwrap_or_else(|| tier_b::propose(current, &mut self.rng, same_type_pool))
    }
}
