//! Hybrid Genetic Algorithm for MWFVS.
//!
//! This module implements the evolutionary loop with:
//! - Randomized cycle-breaking initialization (feasible by construction)
//! - Tournament selection with a diversity branch
//! - Intersection-preserving crossover
//! - Single-vertex flip mutation
//! - Tabu search refinement of every offspring
//! - Elitist (mu + lambda) replacement

use crate::error::{RunError, SolverError};
use crate::fitness::{FitnessEvaluator, DEFAULT_PENALTY};
use crate::heuristics::construction::{ConstructionHeuristic, RandomCycleBreaking};
use crate::heuristics::local_search::TabuSearch;
use crate::instance::FvsInstance;
use crate::solution::{Candidate, FvsSolution, ScoredCandidate};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of generations of a default run
pub const GEN_NUM: usize = 250;

/// Hybrid Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HGAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub generations: usize,
    /// Probability of flipping one random vertex of an offspring
    pub mutation_rate: f64,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Probability that the tournament winner is the best contestant
    pub tournament_prob: f64,
    /// Tabu search iterations per offspring
    pub tabu_max_iterations: usize,
    /// Fraction of the vertices sampled per tabu iteration
    pub neighborhood_ratio: f64,
    /// Penalty per independent cycle left in the graph
    pub penalty: u64,
    /// Random seed
    pub seed: u64,
}

impl Default for HGAConfig {
    fn default() -> Self {
        HGAConfig {
            population_size: 25,
            generations: GEN_NUM,
            mutation_rate: 0.005,
            tournament_size: 5,
            tournament_prob: 0.7,
            tabu_max_iterations: 10,
            neighborhood_ratio: 0.05,
            penalty: DEFAULT_PENALTY,
            seed: 42,
        }
    }
}

impl HGAConfig {
    /// Load a configuration from a JSON file; missing fields take their default value
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check the preconditions of a run
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.population_size == 0 {
            return Err(SolverError::EmptyPopulation);
        }
        if self.tournament_size == 0 {
            return Err(SolverError::EmptyTournament);
        }
        if self.population_size < self.tournament_size {
            return Err(SolverError::PopulationTooSmall {
                population: self.population_size,
                tournament: self.tournament_size,
            });
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("tournament_prob", self.tournament_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SolverError::InvalidProbability {
                    name,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Tournament selection.
///
/// Draws `k` distinct members; with probability `p` returns the fittest of them,
/// otherwise a uniformly random non-best contestant.
pub fn tournament_select<'p>(
    population: &'p [ScoredCandidate],
    k: usize,
    p: f64,
    rng: &mut ChaCha8Rng,
) -> Result<&'p Candidate, SolverError> {
    if k == 0 {
        return Err(SolverError::EmptyTournament);
    }
    if population.len() < k {
        return Err(SolverError::PopulationTooSmall {
            population: population.len(),
            tournament: k,
        });
    }

    let mut contestants: Vec<&ScoredCandidate> = population.choose_multiple(rng, k).collect();
    contestants.sort_by_key(|c| c.fitness);

    if contestants.len() == 1 || rng.gen::<f64>() < p {
        Ok(&contestants[0].candidate)
    } else {
        let idx = rng.gen_range(1..contestants.len());
        Ok(&contestants[idx].candidate)
    }
}

/// Crossover: common vertices plus a random half of the symmetric difference.
///
/// The symmetric difference is shuffled with the run RNG before splitting,
/// so the child only depends on the parents and the seed.
pub fn crossover(parent1: &Candidate, parent2: &Candidate, rng: &mut ChaCha8Rng) -> Candidate {
    let mut child = parent1.intersection(parent2);
    let mut diff = parent1.symmetric_difference(parent2);
    diff.shuffle(rng);

    let half = diff.len() / 2;
    for &v in &diff[..half] {
        child.insert(v);
    }
    child
}

/// Flip one uniformly chosen vertex with probability `mutation_rate`.
///
/// Returns whether a flip happened.
pub fn mutate(candidate: &mut Candidate, num_vertices: usize, mutation_rate: f64, rng: &mut ChaCha8Rng) -> bool {
    if rng.gen::<f64>() >= mutation_rate || num_vertices == 0 {
        return false;
    }
    let v = rng.gen_range(0..num_vertices);
    candidate.flip(v);
    true
}

/// Per-generation convergence and effort figures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTelemetry {
    /// Best fitness after each generation
    pub best_fitness: Vec<u64>,
    /// Cumulative evaluation count after each generation
    pub evaluation_counts: Vec<usize>,
}

impl RunTelemetry {
    pub fn record(&mut self, best_fitness: u64, evaluations: usize) {
        self.best_fitness.push(best_fitness);
        self.evaluation_counts.push(evaluations);
    }

    /// Integer mean of the recorded cumulative evaluation counts (0 when empty)
    pub fn average_evaluations(&self) -> usize {
        if self.evaluation_counts.is_empty() {
            return 0;
        }
        self.evaluation_counts.iter().sum::<usize>() / self.evaluation_counts.len()
    }

    pub fn clear(&mut self) {
        self.best_fitness.clear();
        self.evaluation_counts.clear();
    }
}

/// Hybrid Genetic Algorithm implementation
pub struct HybridGeneticAlgorithm<'a> {
    config: HGAConfig,
    instance: &'a FvsInstance,
    evaluator: FitnessEvaluator<'a>,
    initializer: RandomCycleBreaking,
    tabu_search: TabuSearch,
    population: Vec<ScoredCandidate>,
    telemetry: RunTelemetry,
    rng: ChaCha8Rng,
    generation: usize,
}

impl<'a> HybridGeneticAlgorithm<'a> {
    pub fn new(instance: &'a FvsInstance, config: HGAConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let evaluator = FitnessEvaluator::with_penalty(instance, config.penalty);
        let tabu_search = TabuSearch::with_params(config.tabu_max_iterations, config.neighborhood_ratio);

        HybridGeneticAlgorithm {
            config,
            instance,
            evaluator,
            initializer: RandomCycleBreaking::new(),
            tabu_search,
            population: Vec::new(),
            telemetry: RunTelemetry::default(),
            rng,
            generation: 0,
        }
    }

    /// Reset run state and build a scored, sorted initial population
    pub fn initialize_population(&mut self) {
        self.evaluator.reset();
        self.telemetry.clear();
        self.generation = 0;

        let candidates = self
            .initializer
            .initialize(self.instance, self.config.population_size, &mut self.rng);

        self.population = candidates
            .into_iter()
            .map(|c| {
                let fitness = self.evaluator.evaluate(&c);
                ScoredCandidate::new(c, fitness)
            })
            .collect();
        self.population.sort_by_key(|s| s.fitness);

        log::debug!(
            "initialized population of {} using {} (best {:?}, {} evaluations)",
            self.population.len(),
            self.initializer.name(),
            self.population.first().map(|s| s.fitness),
            self.evaluator.evaluations()
        );
    }

    /// Produce one offspring: select twice, cross over, mutate, refine
    fn breed(&mut self) -> Result<ScoredCandidate, SolverError> {
        let k = self.config.tournament_size;
        let p = self.config.tournament_prob;
        let parent1 = tournament_select(&self.population, k, p, &mut self.rng)?.clone();
        let parent2 = tournament_select(&self.population, k, p, &mut self.rng)?.clone();

        let mut child = crossover(&parent1, &parent2, &mut self.rng);
        mutate(
            &mut child,
            self.instance.num_vertices(),
            self.config.mutation_rate,
            &mut self.rng,
        );

        Ok(self.tabu_search.refine(&mut self.evaluator, &child, &mut self.rng))
    }

    /// Create the next generation
    pub fn evolve(&mut self) -> Result<(), SolverError> {
        let pop_size = self.config.population_size;
        let mut offspring = Vec::with_capacity(pop_size);
        for _ in 0..pop_size {
            offspring.push(self.breed()?);
        }

        // offspring compete with their parents; the stable sort keeps parents ahead on ties
        self.population.extend(offspring);
        self.population.sort_by_key(|s| s.fitness);
        self.population.truncate(pop_size);
        self.generation += 1;

        let best = self.population.first().map(|s| s.fitness).ok_or(SolverError::EmptyPopulation)?;
        self.telemetry.record(best, self.evaluator.evaluations());

        log::debug!(
            "generation {}/{}: best {} evaluations {} diversity {:.2}",
            self.generation,
            self.config.generations,
            best,
            self.evaluator.evaluations(),
            self.population_diversity()
        );
        Ok(())
    }

    /// Run the genetic algorithm
    pub fn run(&mut self) -> Result<FvsSolution, SolverError> {
        self.run_with_progress(|_, _| {})
    }

    /// Run the genetic algorithm, calling `on_generation(generation, best_fitness)` after each generation
    pub fn run_with_progress<F: FnMut(usize, u64)>(&mut self, mut on_generation: F) -> Result<FvsSolution, SolverError> {
        self.config.validate()?;
        let start = std::time::Instant::now();

        log::info!(
            "HGA on {} (|V|={}, |E|={}): population {}, generations {}, seed {}",
            self.instance.name,
            self.instance.num_vertices(),
            self.instance.num_edges(),
            self.config.population_size,
            self.config.generations,
            self.config.seed
        );

        self.initialize_population();

        while self.generation < self.config.generations {
            self.evolve()?;
            if let Some(&best) = self.telemetry.best_fitness.last() {
                on_generation(self.generation, best);
            }
        }

        let best = self.best().ok_or(SolverError::EmptyPopulation)?;
        let mut solution = FvsSolution::from_candidate(self.instance, &best.candidate, best.fitness, "HybridGA");
        solution.fitness_history = self.telemetry.best_fitness.clone();
        solution.avg_evaluations = self.telemetry.average_evaluations();
        solution.generations = self.generation;
        solution.seed = self.config.seed;
        solution.computation_time = start.elapsed().as_secs_f64();

        log::info!(
            "HGA finished on {}: fitness {} ({} vertices removed) in {:.2}s, avg evaluations {}",
            self.instance.name,
            solution.fitness,
            solution.removed.len(),
            solution.computation_time,
            solution.avg_evaluations
        );

        Ok(solution)
    }

    /// Current best member of the population
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.population.first()
    }

    pub fn population(&self) -> &[ScoredCandidate] {
        &self.population
    }

    pub fn telemetry(&self) -> &RunTelemetry {
        &self.telemetry
    }

    /// Fitness evaluations (cache misses) so far in this run
    pub fn evaluations(&self) -> usize {
        self.evaluator.evaluations()
    }

    pub fn current_generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &HGAConfig {
        &self.config
    }

    /// Get population diversity (average symmetric difference between individuals)
    pub fn population_diversity(&self) -> f64 {
        let sample = &self.population[..self.population.len().min(20)];
        if sample.len() < 2 {
            return 0.0;
        }

        let mut total_diff = 0usize;
        let mut count = 0usize;
        for i in 0..sample.len() {
            for j in i + 1..sample.len() {
                total_diff += sample[i].candidate.symmetric_difference(&sample[j].candidate).len();
                count += 1;
            }
        }

        total_diff as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::{path, triangle, two_triangles};
    use proptest::prelude::*;

    fn scored(vertices: Vec<usize>, fitness: u64) -> ScoredCandidate {
        ScoredCandidate::new(Candidate::from_vertices(vertices), fitness)
    }

    fn quick_config(seed: u64) -> HGAConfig {
        HGAConfig {
            generations: 60,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_tournament_requires_enough_members() {
        let population = vec![scored(vec![0], 5), scored(vec![1], 1)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            tournament_select(&population, 5, 0.7, &mut rng),
            Err(SolverError::PopulationTooSmall { population: 2, tournament: 5 })
        );
        assert_eq!(tournament_select(&population, 0, 0.7, &mut rng), Err(SolverError::EmptyTournament));
    }

    #[test]
    fn test_tournament_with_certain_probability_returns_best() {
        let population: Vec<ScoredCandidate> = (0..5).map(|i| scored(vec![i], 10 - i as u64)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..20 {
            let winner = tournament_select(&population, 5, 1.0, &mut rng).unwrap();
            assert_eq!(winner, &Candidate::from_vertices(vec![4]));
        }
    }

    #[test]
    fn test_tournament_with_zero_probability_never_returns_best() {
        let population: Vec<ScoredCandidate> = (0..5).map(|i| scored(vec![i], 10 - i as u64)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..20 {
            let winner = tournament_select(&population, 5, 0.0, &mut rng).unwrap();
            assert_ne!(winner, &Candidate::from_vertices(vec![4]));
        }
    }

    #[test]
    fn test_crossover_keeps_common_vertices() {
        let a = Candidate::from_vertices(vec![1, 2, 3, 8]);
        let b = Candidate::from_vertices(vec![2, 3, 5, 9]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let child = crossover(&a, &b, &mut rng);
        assert!(child.contains(2) && child.contains(3));
        // half of the four distinguishing vertices
        assert_eq!(child.len(), 4);
    }

    #[test]
    fn test_crossover_is_reproducible() {
        let a = Candidate::from_vertices(vec![0, 2, 4, 6, 8]);
        let b = Candidate::from_vertices(vec![1, 3, 5, 7]);
        let c1 = crossover(&a, &b, &mut ChaCha8Rng::seed_from_u64(1));
        let c2 = crossover(&a, &b, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_mutation_rate_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut c = Candidate::from_vertices(vec![1]);

        assert!(!mutate(&mut c, 10, 0.0, &mut rng));
        assert_eq!(c, Candidate::from_vertices(vec![1]));

        assert!(mutate(&mut c, 10, 1.0, &mut rng));
        assert_eq!(c.symmetric_difference(&Candidate::from_vertices(vec![1])).len(), 1);

        assert!(!mutate(&mut c, 0, 1.0, &mut rng));
    }

    #[test]
    fn test_config_validation() {
        assert!(HGAConfig::default().validate().is_ok());

        let small = HGAConfig { population_size: 3, ..Default::default() };
        assert_eq!(
            small.validate(),
            Err(SolverError::PopulationTooSmall { population: 3, tournament: 5 })
        );

        let empty = HGAConfig { population_size: 0, ..Default::default() };
        assert_eq!(empty.validate(), Err(SolverError::EmptyPopulation));

        let bad_rate = HGAConfig { mutation_rate: 1.5, ..Default::default() };
        assert!(matches!(bad_rate.validate(), Err(SolverError::InvalidProbability { .. })));
    }

    #[test]
    fn test_run_fails_fast_on_small_population() {
        let instance = triangle();
        let mut hga = HybridGeneticAlgorithm::new(&instance, HGAConfig { population_size: 4, ..Default::default() });
        assert!(hga.run().is_err());
        assert_eq!(hga.evaluations(), 0);
    }

    #[test]
    fn test_config_json_defaults() {
        let config: HGAConfig = serde_json::from_str(r#"{"population_size": 40, "seed": 7}"#).unwrap();
        assert_eq!(config.population_size, 40);
        assert_eq!(config.seed, 7);
        assert_eq!(config.generations, GEN_NUM);
        assert_eq!(config.tournament_size, 5);
    }

    #[test]
    fn test_telemetry_average() {
        let mut telemetry = RunTelemetry::default();
        assert_eq!(telemetry.average_evaluations(), 0);
        telemetry.record(10, 3);
        telemetry.record(8, 4);
        assert_eq!(telemetry.average_evaluations(), 3);
    }

    #[test]
    fn test_triangle_optimum() {
        let instance = triangle();
        let mut hga = HybridGeneticAlgorithm::new(&instance, quick_config(42));
        let solution = hga.run().unwrap();

        assert_eq!(solution.fitness, 1);
        assert_eq!(solution.removed, vec![2]);
        assert!(solution.feasible);
        assert_eq!(solution.fitness_history.len(), 60);
    }

    #[test]
    fn test_acyclic_graph_converges_to_empty_set() {
        let instance = path();
        let mut hga = HybridGeneticAlgorithm::new(&instance, quick_config(1));
        let solution = hga.run().unwrap();

        assert_eq!(solution.fitness, 0);
        assert!(solution.removed.is_empty());
        assert!(solution.fitness_history.iter().all(|&f| f == 0));
    }

    #[test]
    fn test_disjoint_triangles_optimum() {
        let instance = two_triangles();
        let mut hga = HybridGeneticAlgorithm::new(&instance, HGAConfig { generations: 100, ..Default::default() });
        let solution = hga.run().unwrap();

        // lightest vertex of each triangle: id 1 (weight 4) and id 5 (weight 2)
        assert_eq!(solution.fitness, 6);
        assert_eq!(solution.removed, vec![1, 5]);
    }

    #[test]
    fn test_history_is_monotone_and_evaluations_grow() {
        let instance = two_triangles();
        let mut hga = HybridGeneticAlgorithm::new(&instance, quick_config(3));
        hga.run().unwrap();

        let telemetry = hga.telemetry();
        assert!(telemetry.best_fitness.windows(2).all(|w| w[1] <= w[0]));
        assert!(telemetry.evaluation_counts.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(hga.population().len(), 25);
        assert!(hga.population().windows(2).all(|w| w[0].fitness <= w[1].fitness));
    }

    #[test]
    fn test_same_seed_same_run() {
        let instance = two_triangles();
        let a = HybridGeneticAlgorithm::new(&instance, quick_config(17)).run().unwrap();
        let b = HybridGeneticAlgorithm::new(&instance, quick_config(17)).run().unwrap();

        assert_eq!(a.removed, b.removed);
        assert_eq!(a.fitness_history, b.fitness_history);
        assert_eq!(a.avg_evaluations, b.avg_evaluations);
    }

    #[test]
    fn test_zero_tabu_iterations_still_scores_offspring() {
        let instance = triangle();
        let config = HGAConfig { tabu_max_iterations: 0, ..quick_config(4) };
        let solution = HybridGeneticAlgorithm::new(&instance, config).run().unwrap();
        assert!(solution.fitness <= 5);
        assert!(solution.feasible);
    }

    #[test]
    fn test_config_has_no_refinement_switch() {
        let value = serde_json::to_value(HGAConfig::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&"tabu_max_iterations"));
        assert!(!keys.contains(&"use_local_search"));
    }

    proptest! {
        #[test]
        fn prop_crossover_closure(
            a in proptest::collection::vec(0usize..30, 0..20),
            b in proptest::collection::vec(0usize..30, 0..20),
            seed in any::<u64>(),
        ) {
            let a = Candidate::from_vertices(a);
            let b = Candidate::from_vertices(b);
            let child = crossover(&a, &b, &mut ChaCha8Rng::seed_from_u64(seed));

            let common = a.intersection(&b);
            let all = a.union(&b);
            prop_assert!(common.len() <= child.len());
            prop_assert!(child.len() <= all.len());
            prop_assert!(common.iter().all(|v| child.contains(v)));
            prop_assert!(child.iter().all(|v| all.contains(v)));
        }
    }
}
