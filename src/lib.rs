//! MWFVS Solver Library
//!
//! A hybrid genetic algorithm with tabu search for the Minimum Weight Feedback Vertex Set
//! problem: remove a minimum-weight set of vertices so that the remaining graph is acyclic.
//!
//! # Features
//!
//! - Instance parsing (node weights + lower triangular adjacency matrix)
//! - Penalty-based fitness with a run-scoped cache and evaluation counter
//! - Randomized cycle-breaking initialization
//! - Tournament selection, intersection-preserving crossover, flip mutation
//! - Tabu search refinement of every offspring
//! - Results CSV, per-family statistics and SVG/PNG plots
//!
//! # Example
//!
//! ```no_run
//! use mwfvs_solver::instance::FvsInstance;
//! use mwfvs_solver::heuristics::genetic::{HGAConfig, HybridGeneticAlgorithm};
//!
//! // Load instance
//! let instance = FvsInstance::from_file("instance.txt").unwrap();
//!
//! // Run the hybrid genetic algorithm
//! let config = HGAConfig { seed: 7, ..Default::default() };
//! let mut hga = HybridGeneticAlgorithm::new(&instance, config);
//! let solution = hga.run().unwrap();
//!
//! println!("Best fitness: {} removing {:?}", solution.fitness, solution.removed);
//! ```

pub mod instance;
pub mod solution;
pub mod fitness;
pub mod heuristics;
pub mod benchmark;
pub mod visualization;
pub mod error;

pub use instance::FvsInstance;
pub use solution::{Candidate, FvsSolution};
pub use fitness::FitnessEvaluator;
pub use error::{InstanceError, RunError, SolverError};
