//! Penalty-based objective for MWFVS candidates.
//!
//! The fitness of a candidate is the weight of the removed vertices plus a fixed
//! penalty for every independent cycle left in the remaining graph. Scores are a
//! pure function of the instance and the candidate, so they are memoized for the
//! whole run without invalidation.

use crate::instance::FvsInstance;
use crate::solution::Candidate;
use std::collections::HashMap;

/// Penalty applied per independent cycle of the remaining graph
pub const DEFAULT_PENALTY: u64 = 10_000;

/// Run-scoped fitness evaluator with memoization and an evaluation counter
pub struct FitnessEvaluator<'a> {
    instance: &'a FvsInstance,
    penalty: u64,
    cache: HashMap<Candidate, u64>,
    evaluations: usize,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(instance: &'a FvsInstance) -> Self {
        Self::with_penalty(instance, DEFAULT_PENALTY)
    }

    pub fn with_penalty(instance: &'a FvsInstance, penalty: u64) -> Self {
        FitnessEvaluator {
            instance,
            penalty,
            cache: HashMap::new(),
            evaluations: 0,
        }
    }

    pub fn instance(&self) -> &'a FvsInstance {
        self.instance
    }

    pub fn penalty(&self) -> u64 {
        self.penalty
    }

    /// Fitness of a candidate, served from the cache when available.
    ///
    /// Only cache misses increment the evaluation counter.
    pub fn evaluate(&mut self, candidate: &Candidate) -> u64 {
        if let Some(&value) = self.cache.get(candidate) {
            return value;
        }
        self.evaluations += 1;
        let value = self.compute(candidate);
        self.cache.insert(candidate.clone(), value);
        value
    }

    /// Fitness computed from scratch, bypassing and leaving untouched the cache and counter.
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    pub fn compute(&self, candidate: &Candidate) -> u64 {
        let removed = self.instance.removal_mask(candidate);
        let cycles = self.instance.cycle_basis_size(&removed) as u64;
        self.instance
            .candidate_weight(candidate)
            .saturating_add(self.penalty.saturating_mul(cycles))
    }

    /// Number of cache misses since construction or the last reset
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cached(&self, candidate: &Candidate) -> Option<u64> {
        self.cache.get(candidate).copied()
    }

    /// Clear the cache and the evaluation counter
    pub fn reset(&mut self) {
        self.cache.clear();
        self.evaluations = 0;
    }
}
