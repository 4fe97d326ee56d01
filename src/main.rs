//! MWFVS Solver - Command Line Interface
//!
//! Hybrid genetic algorithm with tabu search for the Minimum Weight Feedback Vertex Set problem.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mwfvs_solver::benchmark::{
    aggregate_statistics, append_record, load_instances_from_dir, read_records, write_statistics_csv, Benchmark,
    BenchmarkConfig, RunRecord,
};
use mwfvs_solver::error::RunError;
use mwfvs_solver::fitness::FitnessEvaluator;
use mwfvs_solver::heuristics::construction::{ConstructionHeuristic, RandomCycleBreaking};
use mwfvs_solver::heuristics::genetic::{HGAConfig, HybridGeneticAlgorithm};
use mwfvs_solver::instance::FvsInstance;
use mwfvs_solver::solution::Candidate;
use mwfvs_solver::visualization::Visualizer;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mwfvs-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Hybrid genetic algorithm with tabu search for the Minimum Weight Feedback Vertex Set")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Solver parameters shared by `solve` and `benchmark`; each flag overrides the config file
#[derive(clap::Args, Debug, Clone)]
struct SolverArgs {
    /// JSON file with an HGAConfig; missing fields take their default value
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population size
    #[arg(short, long)]
    population: Option<usize>,

    /// Number of generations
    #[arg(short, long)]
    generations: Option<usize>,

    /// Mutation probability per offspring
    #[arg(long)]
    mutation_rate: Option<f64>,

    /// Tournament size
    #[arg(long)]
    tournament_size: Option<usize>,

    /// Tabu search iterations per offspring
    #[arg(long)]
    tabu_iterations: Option<usize>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

impl SolverArgs {
    fn to_config(&self) -> Result<HGAConfig, RunError> {
        let mut config = match &self.config {
            Some(path) => HGAConfig::from_json_file(path)?,
            None => HGAConfig::default(),
        };
        if let Some(v) = self.population {
            config.population_size = v;
        }
        if let Some(v) = self.generations {
            config.generations = v;
        }
        if let Some(v) = self.mutation_rate {
            config.mutation_rate = v;
        }
        if let Some(v) = self.tournament_size {
            config.tournament_size = v;
        }
        if let Some(v) = self.tabu_iterations {
            config.tabu_max_iterations = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        #[command(flatten)]
        solver: SolverArgs,

        /// Write the solution as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the run to a results CSV
        #[arg(long, default_value = "results.csv")]
        results: PathBuf,

        /// Do not append the run to the results CSV
        #[arg(long)]
        no_record: bool,

        /// Directory for the convergence plot
        #[arg(long, default_value = "plots")]
        plots_dir: PathBuf,

        /// Save plots as PNG (falls back to SVG when no renderer is available)
        #[arg(long)]
        png: bool,

        /// Also draw the graph with the removed vertices highlighted
        #[arg(long)]
        visualize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        #[command(flatten)]
        solver: SolverArgs,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Aggregate a results CSV by instance family
    Stats {
        /// Results CSV to read
        #[arg(short, long)]
        input: PathBuf,

        /// Statistics CSV to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of initial candidates sampled for the estimate
        #[arg(long, default_value = "25")]
        samples: usize,

        /// Write a drawing of the graph to this SVG file
        #[arg(long)]
        svg: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve { instance, solver, output, results, no_record, plots_dir, png, visualize, verbose } => {
            let results = if no_record { None } else { Some(results) };
            solve_instance(&instance, &solver, output, results, &plots_dir, png, visualize, verbose)
        }

        Commands::Benchmark { dir, output, runs, solver, max_size } => {
            run_benchmark(&dir, &output, runs, &solver, max_size)
        }

        Commands::Stats { input, output } => compute_stats(&input, &output),

        Commands::Analyze { instance, samples, svg } => analyze_instance(&instance, samples, svg),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("Generation {pos}/{len} [{bar:40.cyan/blue}] {msg} ({elapsed_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Save a plot as PNG when requested, falling back to SVG
fn save_plot(viz: &Visualizer, svg: &str, base: &Path, png: bool) -> Result<PathBuf, RunError> {
    if png {
        let path = base.with_extension("png");
        match viz.save_png(svg, &path) {
            Ok(()) => return Ok(path),
            Err(e) => log::warn!("PNG export failed ({}), saving SVG instead", e),
        }
    }
    let path = base.with_extension("svg");
    viz.save_svg(svg, &path)?;
    Ok(path)
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &Path,
    args: &SolverArgs,
    output: Option<PathBuf>,
    results: Option<PathBuf>,
    plots_dir: &Path,
    png: bool,
    visualize: bool,
    verbose: bool,
) -> Result<(), RunError> {
    println!("Loading instance from {:?}...", path);
    let instance = FvsInstance::from_file(path)?;
    let config = args.to_config()?;

    if verbose {
        println!("{}", instance.statistics());
        println!("Configuration: {}", serde_json::to_string(&config)?);
    }

    let pb = progress_bar(config.generations);
    let mut hga = HybridGeneticAlgorithm::new(&instance, config);
    let solution = hga.run_with_progress(|generation, best| {
        pb.set_position(generation as u64);
        pb.set_message(format!("best {}", best));
    });
    pb.finish_and_clear();
    let solution = solution?;

    println!("\n{}", solution);

    if let Some(out_path) = output {
        std::fs::write(&out_path, serde_json::to_string_pretty(&solution)?)?;
        println!("Solution saved to {:?}", out_path);
    }

    let row = match results {
        Some(csv_path) => {
            let row = append_record(&csv_path, &RunRecord::from_solution(&solution))?;
            println!("Run recorded in {:?} (row {})", csv_path, row);
            Some(row)
        }
        None => None,
    };

    std::fs::create_dir_all(plots_dir)?;
    let viz = Visualizer::new();

    let plot_name = match row {
        Some(row) => format!("{}_{}_convergence", row, instance.name),
        None => format!("{}_convergence", instance.name),
    };
    let svg = viz.generate_convergence_svg(&solution.fitness_history, solution.fitness, &instance.name);
    let saved = save_plot(&viz, &svg, &plots_dir.join(plot_name), png)?;
    println!("Convergence plot saved to {:?}", saved);

    if visualize {
        let svg = viz.generate_graph_svg(&instance, &solution.candidate(&instance));
        let saved = save_plot(&viz, &svg, &plots_dir.join(format!("{}_graph", instance.name)), png)?;
        println!("Graph visualization saved to {:?}", saved);
    }

    Ok(())
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    runs: usize,
    args: &SolverArgs,
    max_size: Option<usize>,
) -> Result<(), RunError> {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir)?;
    if let Some(max) = max_size {
        instances.retain(|i| i.num_vertices() <= max);
    }

    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        eprintln!("No instances found!");
        return Ok(());
    }

    std::fs::create_dir_all(output)?;

    let hga = args.to_config()?;
    let config = BenchmarkConfig {
        num_runs: runs,
        base_seed: hga.seed,
        hga,
    };
    let mut benchmark = Benchmark::new(config);

    let pb = ProgressBar::new(instances.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("Instance {pos}/{len} [{bar:40.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    for instance in &instances {
        pb.set_message(instance.name.clone());
        benchmark.run_instance(instance)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    benchmark.export_to_csv(output.join("results.csv"))?;
    benchmark.export_statistics_csv(output.join("statistics.csv"))?;

    let report = benchmark.generate_report();
    println!("{}", report);
    std::fs::write(output.join("report.txt"), &report)?;

    println!("Results saved to {:?}", output);
    Ok(())
}

fn compute_stats(input: &Path, output: &Path) -> Result<(), RunError> {
    let records = read_records(input)?;
    let stats = aggregate_statistics(&records);
    write_statistics_csv(output, &stats)?;

    println!("Aggregated {} runs into {} families", records.len(), stats.len());
    for stat in &stats {
        println!(
            "  {:<30} mean {:>10.2}  std {:>8}  evals {:>8}  time {:.2}s",
            stat.instance_name,
            stat.best_fitness_mean,
            stat.best_fitness_std.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string()),
            stat.fitness_evaluations_mean,
            stat.execution_time_mean
        );
    }
    println!("Statistics saved to {:?}", output);
    Ok(())
}

fn analyze_instance(path: &Path, samples: usize, svg: Option<PathBuf>) -> Result<(), RunError> {
    let instance = FvsInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let total_weight: u64 = instance.weights.iter().sum();
    let cycles = instance.cycle_basis_size(&vec![false; instance.num_vertices()]);
    println!("\nCycle Structure:");
    println!("  Independent cycles: {}", cycles);
    println!("  Total vertex weight: {}", total_weight);

    let mut rng = ChaCha8Rng::seed_from_u64(HGAConfig::default().seed);
    let mut evaluator = FitnessEvaluator::new(&instance);
    let initializer = RandomCycleBreaking::new();
    let fitness: Vec<u64> = initializer
        .initialize(&instance, samples, &mut rng)
        .iter()
        .map(|c| evaluator.evaluate(c))
        .collect();

    if let (Some(best), Some(worst)) = (fitness.iter().min(), fitness.iter().max()) {
        let avg = fitness.iter().sum::<u64>() as f64 / fitness.len() as f64;
        println!("\nQuick Solution Estimates ({} x {}):", samples, initializer.name());
        println!("  Best: {}", best);
        println!("  Average: {:.2}", avg);
        println!("  Worst: {}", worst);
    }

    if let Some(svg_path) = svg {
        let viz = Visualizer::new();
        viz.save_svg(&viz.generate_graph_svg(&instance, &Candidate::new()), &svg_path)?;
        println!("\nGraph visualization saved to {:?}", svg_path);
    }

    Ok(())
}
