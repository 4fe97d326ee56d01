//! Solution representation and manipulation for MWFVS.
//!
//! This module provides the candidate vertex subsets manipulated by the search
//! and the serializable result of a complete run.

use crate::instance::FvsInstance;
use serde::{Deserialize, Serialize};

/// A set of removed vertices (internal indices).
///
/// Stored sorted and duplicate-free, so two candidates compare equal and hash
/// identically exactly when they contain the same vertices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    vertices: Vec<usize>,
}

impl Candidate {
    /// Create an empty candidate
    pub fn new() -> Self {
        Candidate { vertices: Vec::new() }
    }

    /// Create a candidate from vertices in any order, dropping duplicates
    pub fn from_vertices<I: IntoIterator<Item = usize>>(vertices: I) -> Self {
        let mut vertices: Vec<usize> = vertices.into_iter().collect();
        vertices.sort_unstable();
        vertices.dedup();
        Candidate { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, v: usize) -> bool {
        self.vertices.binary_search(&v).is_ok()
    }

    /// Add a vertex; returns `false` if it was already present
    pub fn insert(&mut self, v: usize) -> bool {
        match self.vertices.binary_search(&v) {
            Ok(_) => false,
            Err(pos) => {
                self.vertices.insert(pos, v);
                true
            }
        }
    }

    /// Remove a vertex; returns `false` if it was absent
    pub fn remove(&mut self, v: usize) -> bool {
        match self.vertices.binary_search(&v) {
            Ok(pos) => {
                self.vertices.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Flip the membership of a vertex
    pub fn flip(&mut self, v: usize) {
        match self.vertices.binary_search(&v) {
            Ok(pos) => {
                self.vertices.remove(pos);
            }
            Err(pos) => self.vertices.insert(pos, v),
        }
    }

    /// Copy of this candidate with the membership of `v` flipped
    pub fn flipped(&self, v: usize) -> Self {
        let mut next = self.clone();
        next.flip(v);
        next
    }

    /// Iterate vertices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.vertices
    }

    /// Vertices present in both candidates
    pub fn intersection(&self, other: &Candidate) -> Candidate {
        let (a, b) = (&self.vertices, &other.vertices);
        let (mut i, mut j) = (0, 0);
        let mut common = Vec::with_capacity(a.len().min(b.len()));
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    common.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        Candidate { vertices: common }
    }

    /// Vertices present in exactly one of the candidates, ascending
    pub fn symmetric_difference(&self, other: &Candidate) -> Vec<usize> {
        let (a, b) = (&self.vertices, &other.vertices);
        let (mut i, mut j) = (0, 0);
        let mut diff = Vec::new();
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    diff.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    diff.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        diff.extend_from_slice(&a[i..]);
        diff.extend_from_slice(&b[j..]);
        diff
    }

    /// Vertices present in either candidate
    pub fn union(&self, other: &Candidate) -> Candidate {
        Candidate::from_vertices(self.iter().chain(other.iter()))
    }
}

impl FromIterator<usize> for Candidate {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Candidate::from_vertices(iter)
    }
}

/// A candidate together with its fitness (lower is better)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub fitness: u64,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, fitness: u64) -> Self {
        ScoredCandidate { candidate, fitness }
    }
}

/// Represents the outcome of a search run on an MWFVS instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FvsSolution {
    /// Instance name
    pub instance: String,
    /// Removed vertices, as file identifiers
    pub removed: Vec<u64>,
    /// Objective value: removed weight plus the cycle penalty
    pub fitness: u64,
    /// Total weight of the removed vertices
    pub removed_weight: u64,
    /// Whether the remaining graph is acyclic
    pub feasible: bool,
    /// Best fitness at the end of each generation
    pub fitness_history: Vec<u64>,
    /// Mean of the cumulative evaluation counts recorded after each generation
    pub avg_evaluations: usize,
    /// Number of generations run
    pub generations: usize,
    /// Random seed of the run
    pub seed: u64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl FvsSolution {
    /// Create a solution from a candidate
    pub fn from_candidate(instance: &FvsInstance, candidate: &Candidate, fitness: u64, algorithm: &str) -> Self {
        FvsSolution {
            instance: instance.name.clone(),
            removed: instance.labels_of(candidate),
            fitness,
            removed_weight: instance.candidate_weight(candidate),
            feasible: instance.is_acyclic(candidate),
            fitness_history: Vec::new(),
            avg_evaluations: 0,
            generations: 0,
            seed: 0,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    /// Rebuild the candidate from the stored vertex identifiers, skipping unknown ones
    pub fn candidate(&self, instance: &FvsInstance) -> Candidate {
        self.removed
            .iter()
            .filter_map(|&label| instance.vertex_index(label))
            .collect()
    }

    /// Validate and update solution properties
    pub fn validate(&mut self, instance: &FvsInstance) {
        let candidate = self.candidate(instance);
        self.removed_weight = instance.candidate_weight(&candidate);
        self.feasible = instance.is_acyclic(&candidate);
    }
}

impl std::fmt::Display for FvsSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({}) on {}", self.algorithm, self.instance)?;
        writeln!(f, "  Best fitness: {}", self.fitness)?;
        writeln!(f, "  Removed weight: {}", self.removed_weight)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Generations: {}", self.generations)?;
        writeln!(f, "  Avg evaluations: {}", self.avg_evaluations)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Removed vertices: {:?}", self.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::triangle;

    #[test]
    fn test_candidate_value_semantics() {
        let a = Candidate::from_vertices(vec![3, 1, 2, 1]);
        let b: Candidate = vec![2, 3, 1].into_iter().collect();

        assert_eq!(a, b);
        assert_eq!(a.as_slice(), &[1, 2, 3]);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_flip() {
        let mut c = Candidate::from_vertices(vec![1, 4]);
        c.flip(2);
        assert_eq!(c.as_slice(), &[1, 2, 4]);
        c.flip(4);
        assert_eq!(c.as_slice(), &[1, 2]);
        assert_eq!(c.flipped(1).as_slice(), &[2]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_set_operations() {
        let a = Candidate::from_vertices(vec![1, 2, 3, 7]);
        let b = Candidate::from_vertices(vec![2, 3, 5]);

        assert_eq!(a.intersection(&b).as_slice(), &[2, 3]);
        assert_eq!(a.symmetric_difference(&b), vec![1, 5, 7]);
        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 5, 7]);
    }

    #[test]
    fn test_solution_from_candidate() {
        let instance = triangle();
        let candidate = Candidate::from_vertices(vec![1]);
        let solution = FvsSolution::from_candidate(&instance, &candidate, 1, "test");

        assert_eq!(solution.removed, vec![2]);
        assert_eq!(solution.removed_weight, 1);
        assert!(solution.feasible);
        assert_eq!(solution.candidate(&instance), candidate);
    }

    #[test]
    fn test_removed_labels_are_sorted() {
        // weights declared out of id order: internal 0 is id 3, internal 1 is id 1
        let instance = FvsInstance::new("shuffled", &[(3, 2), (1, 5), (2, 4)], &[(3, 1), (1, 2), (2, 3)]).unwrap();
        let candidate = Candidate::from_vertices(vec![0, 1]);
        let solution = FvsSolution::from_candidate(&instance, &candidate, 7, "test");

        assert_eq!(solution.removed, vec![1, 3]);
        assert_eq!(solution.removed_weight, 7);
        assert_eq!(solution.candidate(&instance), candidate);
        assert!(solution.to_string().contains("[1, 3]"));
    }

    #[test]
    fn test_solution_validate() {
        let instance = triangle();
        let mut solution = FvsSolution::from_candidate(&instance, &Candidate::new(), 10_000, "test");
        assert!(!solution.feasible);

        solution.removed = vec![1, 3];
        solution.validate(&instance);
        assert!(solution.feasible);
        assert_eq!(solution.removed_weight, 8);
    }
}
