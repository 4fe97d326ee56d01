//! Module for parsing and representing Minimum Weight Feedback Vertex Set instances.
//!
//! This module handles the weighted-graph instance files (a node weight section followed
//! by a lower triangular adjacency matrix). It also provides the graph queries the search
//! relies on: cycle detection and cycle-basis size of induced subgraphs.

use crate::error::InstanceError;
use crate::solution::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Represents a weighted undirected graph instance
///
/// Vertices are stored with dense internal indices `0..n`; `labels` keeps the
/// identifiers used in the instance file so results can be reported with them.
#[derive(Debug, Clone)]
pub struct FvsInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// External vertex identifiers, indexed by internal vertex index
    pub labels: Vec<u64>,
    /// Vertex weights, indexed by internal vertex index
    pub weights: Vec<u64>,
    /// Undirected edges as `(u, v)` with `u < v`
    pub edges: Vec<(usize, usize)>,
    adjacency: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Weights,
    Matrix,
}

impl FvsInstance {
    /// Build an instance from `(vertex, weight)` pairs and an edge list over the same vertex ids.
    pub fn new(
        name: impl Into<String>,
        weights: &[(u64, i64)],
        edges: &[(u64, u64)],
    ) -> Result<Self, InstanceError> {
        let mut index: HashMap<u64, usize> = HashMap::with_capacity(weights.len());
        let mut labels = Vec::with_capacity(weights.len());
        let mut vertex_weights = Vec::with_capacity(weights.len());

        for &(vertex, weight) in weights {
            if weight < 0 {
                return Err(InstanceError::NegativeWeight { vertex, weight });
            }
            if index.insert(vertex, labels.len()).is_some() {
                return Err(InstanceError::DuplicateVertex(vertex));
            }
            labels.push(vertex);
            vertex_weights.push(weight as u64);
        }

        let mut adjacency = vec![Vec::new(); labels.len()];
        let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(edges.len());
        let mut edge_list = Vec::with_capacity(edges.len());

        for &(a, b) in edges {
            if a == b {
                return Err(InstanceError::SelfLoop(a));
            }
            let (u, v) = match (index.get(&a), index.get(&b)) {
                (Some(&u), Some(&v)) => (u.min(v), u.max(v)),
                _ => return Err(InstanceError::UnknownVertex(a, b)),
            };
            if seen.insert((u, v)) {
                edge_list.push((u, v));
                adjacency[u].push(v);
                adjacency[v].push(u);
            }
        }

        Ok(FvsInstance {
            name: name.into(),
            comment: String::new(),
            labels,
            weights: vertex_weights,
            edges: edge_list,
            adjacency,
        })
    }

    /// Parse an instance file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| InstanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse an instance from the text of an instance file
    pub fn parse(content: &str) -> Result<Self, InstanceError> {
        let mut name: Option<String> = None;
        let mut comment = String::new();
        let mut weights: Vec<(u64, i64)> = Vec::new();
        let mut edges: Vec<(u64, u64)> = Vec::new();
        let mut section = Section::Header;
        let mut row = 0u64;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if line.starts_with("NODE_WEIGHT_SECTION") {
                section = Section::Weights;
                continue;
            }
            if line.starts_with("ADIACENT_LOWER_TRIANGULAR_MATRIX")
                || line.starts_with("ADJACENT_LOWER_TRIANGULAR_MATRIX")
            {
                section = Section::Matrix;
                continue;
            }
            if let Some(value) = header_value(line, "NAME") {
                name = Some(value.to_string());
                continue;
            }
            if let Some(value) = header_value(line, "COMMENT") {
                comment = value.to_string();
                continue;
            }
            if header_value(line, "TYPE").is_some() {
                continue;
            }

            match section {
                Section::Weights => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() < 2 {
                        return Err(parse_error("weight entry", line_no, line));
                    }
                    let vertex: u64 = parts[0]
                        .parse()
                        .map_err(|_| parse_error("vertex id", line_no, parts[0]))?;
                    let weight: i64 = parts[1]
                        .parse()
                        .map_err(|_| parse_error("weight", line_no, parts[1]))?;
                    weights.push((vertex, weight));
                }
                Section::Matrix => {
                    for (col, token) in line.split_whitespace().enumerate() {
                        let value: i64 = token
                            .parse()
                            .map_err(|_| parse_error("matrix entry", line_no, token))?;
                        if value == 1 {
                            edges.push((row + 1, col as u64 + 1));
                        }
                    }
                    row += 1;
                }
                Section::Header => {}
            }
        }

        let name = name.ok_or(InstanceError::MissingName)?;
        let mut instance = Self::new(name, &weights, &edges)?;
        instance.comment = comment;
        Ok(instance)
    }

    /// Number of vertices
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.labels.len()
    }

    /// Number of (deduplicated) edges
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjacency[v]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    #[inline]
    pub fn weight(&self, v: usize) -> u64 {
        self.weights[v]
    }

    #[inline]
    pub fn label(&self, v: usize) -> u64 {
        self.labels[v]
    }

    /// Internal index of the vertex with the given file identifier
    pub fn vertex_index(&self, label: u64) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    /// File identifiers of the vertices of a candidate, sorted ascending
    pub fn labels_of(&self, candidate: &Candidate) -> Vec<u64> {
        let mut labels: Vec<u64> = candidate.iter().map(|v| self.labels[v]).collect();
        labels.sort_unstable();
        labels
    }

    /// Total weight of the vertices in a candidate
    pub fn candidate_weight(&self, candidate: &Candidate) -> u64 {
        candidate.iter().map(|v| self.weights[v]).sum()
    }

    /// Boolean mask with `true` for every vertex of the candidate
    pub fn removal_mask(&self, candidate: &Candidate) -> Vec<bool> {
        let mut removed = vec![false; self.num_vertices()];
        for v in candidate.iter() {
            removed[v] = true;
        }
        removed
    }

    /// Vertices left in the graph once the candidate is removed
    pub fn remaining_vertices(&self, candidate: &Candidate) -> Vec<usize> {
        (0..self.num_vertices())
            .filter(|&v| !candidate.contains(v))
            .collect()
    }

    /// Edges of the subgraph induced by the vertices not marked in `removed`
    pub fn induced_edges<'a>(&'a self, removed: &'a [bool]) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.edges
            .iter()
            .copied()
            .filter(move |&(u, v)| !removed[u] && !removed[v])
    }

    /// Find any cycle in the subgraph induced by the vertices not marked in `removed`.
    ///
    /// Returns the cycle as a vertex sequence, or `None` when the induced subgraph is a forest.
    pub fn find_cycle(&self, removed: &[bool]) -> Option<Vec<usize>> {
        let n = self.num_vertices();
        let mut visited = vec![false; n];
        let mut parent = vec![usize::MAX; n];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if removed[root] || visited[root] {
                continue;
            }
            visited[root] = true;
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let u = top.0;
                if top.1 == self.adjacency[u].len() {
                    stack.pop();
                    continue;
                }
                let v = self.adjacency[u][top.1];
                top.1 += 1;

                if removed[v] || v == parent[u] {
                    continue;
                }
                if visited[v] {
                    // Non-tree edge: v is an ancestor of u on the DFS path
                    let mut cycle = vec![u];
                    let mut w = u;
                    while w != v {
                        w = parent[w];
                        cycle.push(w);
                    }
                    cycle.reverse();
                    return Some(cycle);
                }
                visited[v] = true;
                parent[v] = u;
                stack.push((v, 0));
            }
        }

        None
    }

    /// Number of independent cycles (cycle-basis size) of the induced subgraph.
    ///
    /// Equals `|E'| - |V'| + components`: every induced edge whose endpoints are
    /// already connected closes exactly one basis cycle.
    pub fn cycle_basis_size(&self, removed: &[bool]) -> usize {
        let mut sets = DisjointSets::new(self.num_vertices());
        self.induced_edges(removed)
            .filter(|&(u, v)| !sets.union(u, v))
            .count()
    }

    /// Check whether removing the candidate leaves a forest
    pub fn is_acyclic(&self, candidate: &Candidate) -> bool {
        self.find_cycle(&self.removal_mask(candidate)).is_none()
    }

    /// Number of connected components of the whole graph
    pub fn num_components(&self) -> usize {
        let mut sets = DisjointSets::new(self.num_vertices());
        let merges = self
            .edges
            .iter()
            .filter(|&&(u, v)| sets.union(u, v))
            .count();
        self.num_vertices() - merges
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.num_vertices();
        let m = self.num_edges();
        let density = if n > 1 {
            2.0 * m as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };
        let degrees: Vec<usize> = (0..n).map(|v| self.degree(v)).collect();
        let total_weight: u64 = self.weights.iter().sum();

        InstanceStatistics {
            name: self.name.clone(),
            num_vertices: n,
            num_edges: m,
            density,
            components: self.num_components(),
            cycle_basis_size: self.cycle_basis_size(&vec![false; n]),
            total_weight,
            min_weight: self.weights.iter().copied().min().unwrap_or(0),
            max_weight: self.weights.iter().copied().max().unwrap_or(0),
            avg_weight: if n > 0 { total_weight as f64 / n as f64 } else { 0.0 },
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            avg_degree: if n > 0 { 2.0 * m as f64 / n as f64 } else { 0.0 },
        }
    }
}

fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    if rest.is_empty() || rest.starts_with(':') || rest.starts_with(char::is_whitespace) {
        Some(rest.trim().trim_start_matches(':').trim())
    } else {
        None
    }
}

fn parse_error(what: &'static str, line: usize, value: &str) -> InstanceError {
    InstanceError::Parse {
        what,
        line,
        value: value.to_string(),
    }
}

/// Union-find with path halving and union by size
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        DisjointSets {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; returns `false` when they were already joined
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

/// Statistics about an MWFVS instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_vertices: usize,
    pub num_edges: usize,
    pub density: f64,
    pub components: usize,
    pub cycle_basis_size: usize,
    pub total_weight: u64,
    pub min_weight: u64,
    pub max_weight: u64,
    pub avg_weight: f64,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Vertices: {}", self.num_vertices)?;
        writeln!(f, "  Edges: {} (density {:.3})", self.num_edges, self.density)?;
        writeln!(f, "  Connected components: {}", self.components)?;
        writeln!(f, "  Independent cycles: {}", self.cycle_basis_size)?;
        writeln!(f, "  Total weight: {}", self.total_weight)?;
        writeln!(f, "  Weight min/avg/max: {} / {:.2} / {}", self.min_weight, self.avg_weight, self.max_weight)?;
        writeln!(f, "  Degree min/avg/max: {} / {:.2} / {}", self.min_degree, self.avg_degree, self.max_degree)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn triangle() -> FvsInstance {
        FvsInstance::new("triangle", &[(1, 5), (2, 1), (3, 3)], &[(1, 2), (2, 3), (1, 3)]).unwrap()
    }

    pub(crate) fn path() -> FvsInstance {
        FvsInstance::new("path", &[(1, 4), (2, 7), (3, 2)], &[(1, 2), (2, 3)]).unwrap()
    }

    pub(crate) fn two_triangles() -> FvsInstance {
        FvsInstance::new(
            "two_triangles",
            &[(1, 4), (2, 9), (3, 6), (4, 8), (5, 2), (6, 7)],
            &[(1, 2), (2, 3), (1, 3), (4, 5), (5, 6), (4, 6)],
        )
        .unwrap()
    }

    const TRIANGLE_FILE: &str = "NAME: tri_test_01\n\
        TYPE: MWFVS\n\
        COMMENT: three vertices\n\
        NODE_WEIGHT_SECTION\n\
        1 5\n\
        2 1\n\
        3 3\n\
        ADIACENT_LOWER_TRIANGULAR_MATRIX\n\
        0\n\
        1 0\n\
        1 1 0\n";

    #[test]
    fn test_parse_instance_file() {
        let instance = FvsInstance::parse(TRIANGLE_FILE).unwrap();

        assert_eq!(instance.name, "tri_test_01");
        assert_eq!(instance.comment, "three vertices");
        assert_eq!(instance.labels, vec![1, 2, 3]);
        assert_eq!(instance.weights, vec![5, 1, 3]);
        assert_eq!(instance.num_edges(), 3);
    }

    #[test]
    fn test_parse_whitespace_headers() {
        let content = TRIANGLE_FILE.replace("NAME: tri_test_01", "NAME tri_test_01");
        let instance = FvsInstance::parse(&content).unwrap();
        assert_eq!(instance.name, "tri_test_01");
    }

    #[test]
    fn test_parse_rejects_malformed_instances() {
        let missing_name = TRIANGLE_FILE.replace("NAME: tri_test_01\n", "");
        assert!(matches!(FvsInstance::parse(&missing_name), Err(InstanceError::MissingName)));

        let unknown = TRIANGLE_FILE.replace("3 3\n", "");
        assert!(matches!(FvsInstance::parse(&unknown), Err(InstanceError::UnknownVertex(_, _))));

        let self_loop = TRIANGLE_FILE.replace("1 0\n1 1 0", "1 1\n1 1 0");
        assert!(matches!(FvsInstance::parse(&self_loop), Err(InstanceError::SelfLoop(2))));

        let bad_weight = TRIANGLE_FILE.replace("2 1\n", "2 x\n");
        assert!(matches!(FvsInstance::parse(&bad_weight), Err(InstanceError::Parse { .. })));
    }

    #[test]
    fn test_find_cycle() {
        let tri = triangle();
        let cycle = tri.find_cycle(&[false, false, false]).unwrap();
        let mut sorted = cycle.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);

        assert!(tri.find_cycle(&[false, true, false]).is_none());
        assert!(path().find_cycle(&[false, false, false]).is_none());
    }

    #[test]
    fn test_found_cycle_is_closed_walk() {
        // square 1-2-3-4 with a pendant vertex 5
        let g = FvsInstance::new(
            "square",
            &[(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)],
            &[(1, 2), (2, 3), (3, 4), (4, 1), (4, 5)],
        )
        .unwrap();
        let cycle = g.find_cycle(&vec![false; 5]).unwrap();
        assert_eq!(cycle.len(), 4);
        for i in 0..cycle.len() {
            let (a, b) = (cycle[i], cycle[(i + 1) % cycle.len()]);
            assert!(g.neighbors(a).contains(&b));
        }
    }

    #[test]
    fn test_cycle_basis_size() {
        let k4 = FvsInstance::new(
            "k4",
            &[(1, 1), (2, 1), (3, 1), (4, 1)],
            &[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)],
        )
        .unwrap();
        assert_eq!(k4.cycle_basis_size(&[false; 4]), 3);
        assert_eq!(k4.cycle_basis_size(&[true, false, false, false]), 1);
        assert_eq!(k4.cycle_basis_size(&[true, true, false, false]), 0);

        assert_eq!(two_triangles().cycle_basis_size(&[false; 6]), 2);
        assert_eq!(path().cycle_basis_size(&[false; 3]), 0);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let g = FvsInstance::new("dup", &[(1, 1), (2, 1)], &[(1, 2), (2, 1)]).unwrap();
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.cycle_basis_size(&[false, false]), 0);
    }

    #[test]
    fn test_statistics() {
        let stats = two_triangles().statistics();
        assert_eq!(stats.num_vertices, 6);
        assert_eq!(stats.num_edges, 6);
        assert_eq!(stats.components, 2);
        assert_eq!(stats.cycle_basis_size, 2);
        assert_eq!(stats.min_weight, 2);
        assert_eq!(stats.max_weight, 9);
        assert!(stats.to_string().contains("two_triangles"));
    }
}
