//! Error types for instance loading, solving and result persistence.

use std::path::PathBuf;

/// Errors raised while reading or validating an instance.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("Cannot open file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Missing NAME header")]
    MissingName,
    #[error("Invalid {what} at line {line}: {value:?}")]
    Parse {
        what: &'static str,
        line: usize,
        value: String,
    },
    #[error("Vertex {vertex} has a negative weight {weight}")]
    NegativeWeight { vertex: u64, weight: i64 },
    #[error("Vertex {0} is declared twice in the weight section")]
    DuplicateVertex(u64),
    #[error("Edge ({0}, {1}) references a vertex without a weight")]
    UnknownVertex(u64, u64),
    #[error("Self-loop on vertex {0}")]
    SelfLoop(u64),
}

/// Errors raised by the search engine before or during a run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SolverError {
    #[error("Population size must be at least 1")]
    EmptyPopulation,
    #[error("Population of {population} is smaller than the tournament size {tournament}")]
    PopulationTooSmall { population: usize, tournament: usize },
    #[error("Tournament size must be at least 1")]
    EmptyTournament,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: String },
}

/// Errors raised while loading configuration, running experiments or persisting results.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
