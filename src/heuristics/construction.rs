use crate::instance::FvsInstance;
use crate::solution::Candidate;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Builds feasible candidates (removal leaves the graph acyclic)
pub trait ConstructionHeuristic {
    fn construct(&self, instance: &FvsInstance, rng: &mut ChaCha8Rng) -> Candidate;
    fn name(&self) -> &str;

    /// Build `pop_size` independent candidates
    fn initialize(&self, instance: &FvsInstance, pop_size: usize, rng: &mut ChaCha8Rng) -> Vec<Candidate> {
        (0..pop_size).map(|_| self.construct(instance, rng)).collect()
    }
}

/// Randomized cycle breaking
///
/// Repeatedly finds a cycle in the remaining graph and removes one of its
/// vertices chosen uniformly at random, until the remaining graph is a forest.
/// Every removal shrinks the remaining vertex set, so construction terminates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCycleBreaking;

impl RandomCycleBreaking {
    pub fn new() -> Self {
        RandomCycleBreaking
    }
}

impl ConstructionHeuristic for RandomCycleBreaking {
    fn construct(&self, instance: &FvsInstance, rng: &mut ChaCha8Rng) -> Candidate {
        let mut removed = vec![false; instance.num_vertices()];
        let mut candidate = Candidate::new();

        while let Some(cycle) = instance.find_cycle(&removed) {
            let v = cycle[rng.gen_range(0..cycle.len())];
            removed[v] = true;
            candidate.insert(v);
        }

        candidate
    }

    fn name(&self) -> &str {
        "RandomCycleBreaking"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::{path, triangle, two_triangles};

    #[test]
    fn test_initial_population_is_feasible() {
        let k5_edges: Vec<(u64, u64)> = (1..=5)
            .flat_map(|a| (a + 1..=5).map(move |b| (a, b)))
            .collect();
        let k5 = FvsInstance::new("k5", &[(1, 3), (2, 1), (3, 4), (4, 1), (5, 5)], &k5_edges).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for instance in [triangle(), two_triangles(), k5] {
            let population = RandomCycleBreaking::new().initialize(&instance, 20, &mut rng);
            assert_eq!(population.len(), 20);
            for candidate in &population {
                assert!(instance.is_acyclic(candidate));
                assert_eq!(instance.cycle_basis_size(&instance.removal_mask(candidate)), 0);
            }
        }
    }

    #[test]
    fn test_acyclic_instance_yields_empty_candidates() {
        let instance = path();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = RandomCycleBreaking::new().initialize(&instance, 5, &mut rng);
        assert!(population.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_triangle_population_is_diverse() {
        let instance = triangle();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let population = RandomCycleBreaking::new().initialize(&instance, 25, &mut rng);

        // exactly one vertex of the single triangle is removed
        assert!(population.iter().all(|c| c.len() == 1));
        let distinct: std::collections::HashSet<_> = population.iter().collect();
        assert!(distinct.len() > 1);
    }
}
