//! Benchmarking and experimentation module for MWFVS.
//!
//! Provides the results CSV shared by single runs and benchmarks, the
//! per-family statistics computed from it, and a driver for repeated runs
//! over a directory of instances.

use crate::error::{RunError, SolverError};
use crate::heuristics::genetic::{HGAConfig, HybridGeneticAlgorithm};
use crate::instance::FvsInstance;
use crate::solution::FvsSolution;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Instance file extensions picked up by [`load_instances_from_dir`]
pub const INSTANCE_EXTENSIONS: [&str; 3] = ["txt", "fvs", "dat"];

/// One row of the results CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub instance_name: String,
    pub best_fitness: u64,
    /// Average cumulative evaluation count over the generations of the run
    pub fitness_evaluations: usize,
    pub generations: usize,
    /// Wall-clock time in seconds
    pub execution_time: f64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub timestamp: String,
}

impl RunRecord {
    pub fn from_solution(solution: &FvsSolution) -> Self {
        RunRecord {
            instance_name: solution.instance.clone(),
            best_fitness: solution.fitness,
            fitness_evaluations: solution.avg_evaluations,
            generations: solution.generations,
            execution_time: solution.computation_time,
            seed: solution.seed,
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Read every record of a results CSV
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<RunRecord>, RunError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Column names of the results CSV, in file order
pub const RESULT_COLUMNS: [&str; 7] = [
    "instance_name",
    "best_fitness",
    "fitness_evaluations",
    "generations",
    "execution_time",
    "seed",
    "timestamp",
];

/// Append a record to a results CSV, writing the header if the file is new or empty.
///
/// A file with an older header (for instance without `seed` and `timestamp`) is
/// rewritten with the full header first; its rows keep their values and get the
/// default for the missing columns.
///
/// Returns the 0-based row index of the appended record.
pub fn append_record<P: AsRef<Path>>(path: P, record: &RunRecord) -> Result<usize, RunError> {
    let path = path.as_ref();
    let has_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);

    if !has_content {
        let mut writer = csv::Writer::from_path(path)?;
        writer.serialize(record)?;
        writer.flush()?;
        log::debug!("started {} with row 0", path.display());
        return Ok(0);
    }

    let mut reader = csv::Reader::from_path(path)?;
    let current_header = reader.headers()?.iter().eq(RESULT_COLUMNS.iter().copied());
    let mut records = Vec::new();
    for existing in reader.deserialize::<RunRecord>() {
        records.push(existing?);
    }
    let row = records.len();

    if current_header {
        let file = OpenOptions::new().append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
    } else {
        log::info!("upgrading {} to the {}-column results format", path.display(), RESULT_COLUMNS.len());
        let mut writer = csv::Writer::from_path(path)?;
        for existing in records.iter().chain(std::iter::once(record)) {
            writer.serialize(existing)?;
        }
        writer.flush()?;
    }

    log::debug!("appended row {} to {}", row, path.display());
    Ok(row)
}

/// Aggregated statistics for a family of instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFamilyStatistics {
    /// Family key (first three `_`-separated tokens of the instance names)
    pub instance_name: String,
    pub best_fitness_mean: f64,
    /// Sample standard deviation; absent for single-instance families
    pub best_fitness_std: Option<f64>,
    pub fitness_evaluations_mean: u64,
    pub execution_time_mean: f64,
}

/// Family key of an instance name: its first three `_`-separated tokens
pub fn family_key(instance_name: &str) -> String {
    instance_name.split('_').take(3).collect::<Vec<_>>().join("_")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keep the best run of every instance, then aggregate instances by family.
///
/// Output is sorted by family key.
pub fn aggregate_statistics(records: &[RunRecord]) -> Vec<InstanceFamilyStatistics> {
    let mut best_runs: BTreeMap<&str, &RunRecord> = BTreeMap::new();
    for record in records {
        best_runs
            .entry(record.instance_name.as_str())
            .and_modify(|best| {
                if record.best_fitness < best.best_fitness {
                    *best = record;
                }
            })
            .or_insert(record);
    }

    let mut families: BTreeMap<String, Vec<&RunRecord>> = BTreeMap::new();
    for (name, record) in best_runs {
        families.entry(family_key(name)).or_default().push(record);
    }

    families
        .into_iter()
        .map(|(family, members)| {
            let fitness: Vec<f64> = members.iter().map(|r| r.best_fitness as f64).collect();
            let evaluations: Vec<f64> = members.iter().map(|r| r.fitness_evaluations as f64).collect();
            let times: Vec<f64> = members.iter().map(|r| r.execution_time).collect();

            let best_fitness_std = if fitness.len() > 1 {
                Some(round2(fitness.iter().std_dev()))
            } else {
                None
            };

            InstanceFamilyStatistics {
                instance_name: family,
                best_fitness_mean: fitness.iter().mean(),
                best_fitness_std,
                fitness_evaluations_mean: evaluations.iter().mean() as u64,
                execution_time_mean: round2(times.iter().mean()),
            }
        })
        .collect()
}

/// Write family statistics as CSV
pub fn write_statistics_csv<P: AsRef<Path>>(path: P, stats: &[InstanceFamilyStatistics]) -> Result<(), RunError> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per instance
    pub num_runs: usize,
    /// Seed of the first run; run `r` uses `base_seed + r`
    pub base_seed: u64,
    /// Solver parameters shared by every run
    pub hga: HGAConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        let hga = HGAConfig::default();
        BenchmarkConfig {
            num_runs: 5,
            base_seed: hga.seed,
            hga,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunRecord>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// Run the solver `num_runs` times on an instance and record every run
    pub fn run_instance(&mut self, instance: &FvsInstance) -> Result<Vec<FvsSolution>, SolverError> {
        log::info!("Running benchmark on instance: {}", instance.name);

        let mut solutions = Vec::with_capacity(self.config.num_runs);
        for run in 0..self.config.num_runs {
            let config = HGAConfig {
                seed: self.config.base_seed + run as u64,
                ..self.config.hga.clone()
            };
            let solution = HybridGeneticAlgorithm::new(instance, config).run()?;
            log::info!(
                "  run {}/{} (seed {}): fitness {} in {:.2}s",
                run + 1,
                self.config.num_runs,
                solution.seed,
                solution.fitness,
                solution.computation_time
            );
            self.results.push(RunRecord::from_solution(&solution));
            solutions.push(solution);
        }
        Ok(solutions)
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[FvsInstance]) -> Result<(), SolverError> {
        for instance in instances {
            self.run_instance(instance)?;
        }
        Ok(())
    }

    /// Family statistics over the recorded runs
    pub fn compute_statistics(&self) -> Vec<InstanceFamilyStatistics> {
        aggregate_statistics(&self.results)
    }

    /// Export raw run records to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), RunError> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), RunError> {
        write_statistics_csv(path, &self.compute_statistics())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        MWFVS Benchmark Report\n");
        report.push_str("========================================\n\n");

        report.push_str("Family Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<30} {:>12} {:>10} {:>14} {:>10}\n",
            "Family", "Mean Best", "Std", "Mean Evals", "Mean Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            let std_str = stat
                .best_fitness_std
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<30} {:>12.2} {:>10} {:>14} {:>10.2}\n",
                stat.instance_name, stat.best_fitness_mean, std_str, stat.fitness_evaluations_mean, stat.execution_time_mean
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");

        let mut instance_best: BTreeMap<&str, &RunRecord> = BTreeMap::new();
        for result in &self.results {
            let entry = instance_best.entry(result.instance_name.as_str()).or_insert(result);
            if result.best_fitness < entry.best_fitness {
                *entry = result;
            }
        }

        for (instance, best) in &instance_best {
            report.push_str(&format!("  {}: {} (seed {})\n", instance, best.best_fitness, best.seed));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunRecord] {
        &self.results
    }
}

/// Load every parseable instance of a directory, sorted by size then name.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<FvsInstance>, RunError> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| INSTANCE_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        match FvsInstance::from_file(&path) {
            Ok(instance) => instances.push(instance),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    instances.sort_by(|a, b| {
        a.num_vertices()
            .cmp(&b.num_vertices())
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(instances)
}
