//! Heuristics module for MWFVS.
//!
//! This module exports the population initializer, the tabu search refinement
//! and the hybrid genetic algorithm built on top of them.

pub mod construction;
pub mod local_search;
pub mod genetic;

pub use construction::*;
pub use local_search::*;
pub use genetic::*;
