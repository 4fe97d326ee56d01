//! Tabu search refinement for MWFVS candidates.
//!
//! Moves flip the membership of a single vertex. Each iteration samples a random
//! subset of the vertices, evaluates the non-tabu flips of the current candidate
//! and moves to the best of them, even when it is worse than the current one.
//! Visited candidates are kept in a bounded FIFO tabu list scoped to one call.

use crate::fitness::FitnessEvaluator;
use crate::solution::{Candidate, ScoredCandidate};
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Bounded FIFO memory of recently accepted candidates
#[derive(Debug, Clone)]
pub struct TabuList {
    entries: VecDeque<Candidate>,
    capacity: usize,
}

impl TabuList {
    pub fn new(capacity: usize) -> Self {
        TabuList {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Tabu list sized for a graph with `num_vertices` vertices
    pub fn for_vertex_count(num_vertices: usize) -> Self {
        Self::new(Self::capacity_for(num_vertices))
    }

    /// `max(5, ceil(n^0.4))`
    pub fn capacity_for(num_vertices: usize) -> usize {
        ((num_vertices as f64).powf(0.4).ceil() as usize).max(5)
    }

    /// Append a candidate, returning the evicted oldest entry on overflow
    pub fn push(&mut self, candidate: Candidate) -> Option<Candidate> {
        self.entries.push_back(candidate);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.entries.iter().any(|c| c == candidate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Result of one tabu search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabuOutcome {
    /// Best candidate visited, never worse than the start
    pub best: ScoredCandidate,
    /// Moves actually made before the iteration budget ran out or no admissible neighbor was left
    pub moves: usize,
}

/// Tabu Search over single-vertex flips
#[derive(Debug, Clone)]
pub struct TabuSearch {
    /// Maximum number of moves per call
    pub max_iterations: usize,
    /// Fraction of the vertices sampled as neighborhood each iteration
    pub neighborhood_ratio: f64,
    /// Fixed tabu list capacity; `None` sizes it from the vertex count
    pub tabu_capacity: Option<usize>,
}

impl TabuSearch {
    pub fn new() -> Self {
        TabuSearch {
            max_iterations: 10,
            neighborhood_ratio: 0.05,
            tabu_capacity: None,
        }
    }

    pub fn with_params(max_iterations: usize, neighborhood_ratio: f64) -> Self {
        TabuSearch {
            max_iterations,
            neighborhood_ratio,
            tabu_capacity: None,
        }
    }

    pub fn with_tabu_capacity(mut self, capacity: usize) -> Self {
        self.tabu_capacity = Some(capacity);
        self
    }

    /// `ceil(ratio * n)`, never more than `n`
    pub fn neighborhood_size(&self, num_vertices: usize) -> usize {
        ((self.neighborhood_ratio * num_vertices as f64).ceil() as usize).min(num_vertices)
    }

    /// Refine a candidate and return the best candidate visited with its fitness.
    ///
    /// The result is never worse than the input. The call ends early when every
    /// sampled flip is tabu.
    pub fn refine(
        &self,
        evaluator: &mut FitnessEvaluator<'_>,
        candidate: &Candidate,
        rng: &mut ChaCha8Rng,
    ) -> ScoredCandidate {
        self.search(evaluator, candidate, rng).best
    }

    /// Same as [`TabuSearch::refine`], also reporting how many moves were made
    pub fn search(
        &self,
        evaluator: &mut FitnessEvaluator<'_>,
        candidate: &Candidate,
        rng: &mut ChaCha8Rng,
    ) -> TabuOutcome {
        let num_vertices = evaluator.instance().num_vertices();
        let sample_size = self.neighborhood_size(num_vertices);
        let mut tabu_list = match self.tabu_capacity {
            Some(capacity) => TabuList::new(capacity),
            None => TabuList::for_vertex_count(num_vertices),
        };
        let mut moves = 0;

        let mut current = candidate.clone();
        let mut best = candidate.clone();
        let mut best_fitness = evaluator.evaluate(&best);

        for iteration in 0..self.max_iterations {
            let mut best_neighbor: Option<(Candidate, u64)> = None;

            for v in index::sample(rng, num_vertices, sample_size).into_iter() {
                let neighbor = current.flipped(v);
                if tabu_list.contains(&neighbor) {
                    continue;
                }
                let fitness = evaluator.evaluate(&neighbor);
                if best_neighbor.as_ref().map_or(true, |&(_, f)| fitness < f) {
                    best_neighbor = Some((neighbor, fitness));
                }
            }

            let (neighbor, fitness) = match best_neighbor {
                Some(found) => found,
                None => {
                    log::trace!("tabu search: no admissible neighbor at iteration {}", iteration);
                    break;
                }
            };

            if fitness < best_fitness {
                best = neighbor.clone();
                best_fitness = fitness;
            }
            current = neighbor.clone();
            tabu_list.push(neighbor);
            moves += 1;
        }

        TabuOutcome {
            best: ScoredCandidate::new(best, best_fitness),
            moves,
        }
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::{triangle, two_triangles};
    use crate::instance::FvsInstance;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_tabu_list_capacity() {
        assert_eq!(TabuList::capacity_for(0), 5);
        assert_eq!(TabuList::capacity_for(3), 5);
        assert_eq!(TabuList::capacity_for(100), 7);
        assert_eq!(TabuList::capacity_for(1000), 16);
    }

    #[test]
    fn test_tabu_list_evicts_oldest() {
        let a = Candidate::from_vertices(vec![1]);
        let b = Candidate::from_vertices(vec![2]);
        let c = Candidate::from_vertices(vec![1, 2]);

        let mut tabu_list = TabuList::new(2);
        assert_eq!(tabu_list.push(a.clone()), None);
        assert_eq!(tabu_list.push(b.clone()), None);
        assert_eq!(tabu_list.push(c.clone()), Some(a.clone()));

        assert_eq!(tabu_list.len(), 2);
        assert!(!tabu_list.contains(&a));
        assert!(tabu_list.contains(&b));
        assert!(tabu_list.contains(&c));
    }

    #[test]
    fn test_neighborhood_size() {
        let ts = TabuSearch::new();
        assert_eq!(ts.neighborhood_size(0), 0);
        assert_eq!(ts.neighborhood_size(3), 1);
        assert_eq!(ts.neighborhood_size(100), 5);
        assert_eq!(ts.neighborhood_size(101), 6);
        assert_eq!(TabuSearch::with_params(10, 2.0).neighborhood_size(4), 4);
    }

    #[test]
    fn test_refine_finds_triangle_optimum() {
        let instance = triangle();
        let mut evaluator = FitnessEvaluator::new(&instance);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // full neighborhood: every flip of the current candidate is examined
        let ts = TabuSearch::with_params(10, 1.0);
        let result = ts.refine(&mut evaluator, &Candidate::from_vertices(vec![0]), &mut rng);

        assert_eq!(result.fitness, 1);
        assert_eq!(result.candidate, Candidate::from_vertices(vec![1]));
    }

    #[test]
    fn test_refine_on_empty_graph_returns_input() {
        let instance = FvsInstance::new("empty", &[], &[]).unwrap();
        let mut evaluator = FitnessEvaluator::new(&instance);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = TabuSearch::new().refine(&mut evaluator, &Candidate::new(), &mut rng);
        assert!(result.candidate.is_empty());
        assert_eq!(result.fitness, 0);
    }

    #[test]
    fn test_evicted_candidate_can_be_revisited() {
        // a single isolated vertex: the only moves toggle between {} and {0}
        let instance = FvsInstance::new("single", &[(1, 3)], &[]).unwrap();
        let start = Candidate::new();

        // capacity 1: each move evicts the previous state, so the walk never stalls
        let mut evaluator = FitnessEvaluator::new(&instance);
        let ts = TabuSearch::with_params(4, 1.0).with_tabu_capacity(1);
        let outcome = ts.search(&mut evaluator, &start, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(outcome.moves, 4);
        assert_eq!(outcome.best, ScoredCandidate::new(Candidate::new(), 0));

        // capacity 2: both states stay tabu after two moves
        let ts = TabuSearch::with_params(4, 1.0).with_tabu_capacity(2);
        let outcome = ts.search(&mut evaluator, &start, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(outcome.moves, 2);

        // default capacity is at least 5
        let outcome = TabuSearch::with_params(4, 1.0).search(&mut evaluator, &start, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(outcome.moves, 2);
    }

    proptest! {
        #[test]
        fn prop_refine_never_worsens(
            vertices in proptest::collection::vec(0usize..6, 0..6),
            seed in any::<u64>(),
        ) {
            let instance = two_triangles();
            let mut evaluator = FitnessEvaluator::new(&instance);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let start = Candidate::from_vertices(vertices);
            let start_fitness = evaluator.compute(&start);

            let result = TabuSearch::with_params(10, 0.5).refine(&mut evaluator, &start, &mut rng);
            prop_assert!(result.fitness <= start_fitness);
            prop_assert_eq!(result.fitness, evaluator.compute(&result.candidate));
        }
    }
}
