//! Batch Experiment Runner
//!
//! Executes Monte Carlo batches of the service center from a TOML file,
//! optionally sweeping one model parameter.
//!
//! Usage:
//!   cargo run --release --bin run_experiment -- experiments/baseline_monte_carlo.toml
//!   cargo run --release --bin run_experiment -- experiments/staffing_sweep.toml --threads 4

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;
use service_center::output::{
    AggregateMetrics, BatchMetadata, MeanStd, save_batch, write_metadata_json,
};
use service_center::{ConfigError, ModelConfig, MonteCarlo, RunOutcome};

#[derive(Parser, Debug)]
#[command(about = "Monte Carlo batches of the service center")]
struct Args {
    /// Experiment TOML file
    experiment: PathBuf,

    /// Worker threads (defaults to the experiment file, then all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Output directory (defaults to results/<experiment name>)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Top-level experiment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExperimentConfig {
    experiment: ExperimentMetadata,
    model: ModelConfig,
    sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExperimentMetadata {
    name: String,
    description: String,
    num_runs: usize,
    base_seed: u64,
    threads: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SweepConfig {
    parameter: String,
    values: Vec<f64>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("=== Service Center Experiment Runner ===\n");
    println!("Loading experiment config: {}\n", args.experiment.display());

    let config_str = fs::read_to_string(&args.experiment).unwrap_or_else(|e| {
        fail(format!("reading {}: {}", args.experiment.display(), e))
    });
    let exp_config: ExperimentConfig =
        toml::from_str(&config_str).unwrap_or_else(|e| fail(format!("parsing TOML config: {}", e)));

    println!("Experiment: {}", exp_config.experiment.name);
    println!("Description: {}", exp_config.experiment.description);
    println!(
        "Configuration: {} runs × {} hours\n",
        exp_config.experiment.num_runs, exp_config.model.hours_to_run
    );

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("results").join(&exp_config.experiment.name));
    let threads = args.threads.or(exp_config.experiment.threads);

    match &exp_config.sweep {
        Some(sweep) => run_parameter_sweep(&exp_config, sweep, threads, &output_dir),
        None => run_simple_experiment(&exp_config, threads, &output_dir),
    }
}

fn run_batch(
    model: ModelConfig,
    num_runs: usize,
    base_seed: u64,
    threads: Option<usize>,
) -> Vec<RunOutcome> {
    let mut batch = MonteCarlo::new(model, num_runs, base_seed).progress((num_runs / 10).max(1));
    if let Some(n) = threads {
        batch = batch.num_threads(n);
    }
    batch.run().unwrap_or_else(|e| fail(e))
}

fn report_failures(outcomes: &[RunOutcome]) {
    for outcome in outcomes {
        if let Err(reason) = &outcome.result {
            eprintln!(
                "  Run {} (seed={}) failed: {}",
                outcome.run_id, outcome.seed, reason
            );
        }
    }
}

/// Run simple experiment (no parameter sweep)
fn run_simple_experiment(exp_config: &ExperimentConfig, threads: Option<usize>, output_dir: &Path) {
    let start_time = Instant::now();
    let total_runs = exp_config.experiment.num_runs;

    println!("Running {} Monte Carlo simulations...\n", total_runs);

    let base_seed = exp_config.experiment.base_seed;
    let outcomes = run_batch(exp_config.model.clone(), total_runs, base_seed, threads);
    report_failures(&outcomes);

    let metadata = BatchMetadata::new(&exp_config.model, total_runs, base_seed);
    write_metadata_json(&output_dir.join("metadata.json"), &metadata).unwrap_or_else(|e| fail(e));

    println!("\n=== Aggregating Results ===\n");
    let aggregate = save_batch(output_dir, &outcomes).unwrap_or_else(|e| fail(e));
    print_aggregate_summary(&aggregate);

    let total_elapsed = start_time.elapsed();
    println!(
        "\n✓ Experiment complete in {:.1}s ({:.3}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / total_runs.max(1) as f64
    );
    println!("Results saved to: {}", output_dir.display());
}

/// Run parameter sweep experiment
fn run_parameter_sweep(
    exp_config: &ExperimentConfig,
    sweep: &SweepConfig,
    threads: Option<usize>,
    output_dir: &Path,
) {
    let start_time = Instant::now();
    let num_runs = exp_config.experiment.num_runs;
    let total_combinations = sweep.values.len() * num_runs;

    println!("Parameter sweep: {} ∈ {:?}", sweep.parameter, sweep.values);
    println!(
        "Total simulations: {} parameter values × {} runs = {}\n",
        sweep.values.len(),
        num_runs,
        total_combinations
    );

    fs::create_dir_all(output_dir).unwrap_or_else(|e| fail(e));
    let mut sweep_aggregates: BTreeMap<String, AggregateMetrics> = BTreeMap::new();

    for (param_idx, &param_value) in sweep.values.iter().enumerate() {
        println!(
            "\n--- {}={} ({}/{}) ---\n",
            sweep.parameter,
            param_value,
            param_idx + 1,
            sweep.values.len()
        );

        let mut model = exp_config.model.clone();
        apply_parameter_value(&mut model, &sweep.parameter, param_value).unwrap_or_else(|e| fail(e));

        let base_seed = exp_config.experiment.base_seed + (param_idx * num_runs) as u64;
        let metadata = BatchMetadata::new(&model, num_runs, base_seed);
        let outcomes = run_batch(model, num_runs, base_seed, threads);
        report_failures(&outcomes);

        let param_key = format!("{}_{}", sweep.parameter, param_value);
        let param_dir = output_dir.join(&param_key);
        let aggregate = save_batch(&param_dir, &outcomes).unwrap_or_else(|e| fail(e));
        write_metadata_json(&param_dir.join("metadata.json"), &metadata)
            .unwrap_or_else(|e| fail(e));

        println!(
            "  → Finished: {}, Loss rate: {}, Mean wait: {}",
            format_mean(&aggregate.finished),
            format_mean(&aggregate.loss_rate),
            format_mean(&aggregate.mean_waiting_time)
        );

        sweep_aggregates.insert(param_key, aggregate);
    }

    let sweep_json = serde_json::to_string_pretty(&sweep_aggregates).unwrap_or_else(|e| fail(e));
    fs::write(output_dir.join("sweep_summary.json"), sweep_json).unwrap_or_else(|e| fail(e));

    let total_elapsed = start_time.elapsed();
    println!(
        "\n✓ Parameter sweep complete in {:.1}s ({:.3}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / total_combinations.max(1) as f64
    );
    println!("Results saved to: {}", output_dir.display());
}

/// Apply parameter value to model config
fn apply_parameter_value(
    config: &mut ModelConfig,
    param_name: &str,
    value: f64,
) -> Result<(), ConfigError> {
    let as_count = |field: &'static str| -> Result<usize, ConfigError> {
        if value < 0.0 || value.fract() != 0.0 {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("sweep value {} is not a whole number", value),
            });
        }
        Ok(value as usize)
    };

    match param_name {
        "arrival_rate_mean" => config.arrival_rate_mean = value,
        "workload_mean" => config.workload_mean = value,
        "server_rate_mean" => config.server_rate_mean = value,
        "num_servers" => config.num_servers = as_count("num_servers")?,
        "queue_capacity" => config.queue_capacity = Some(as_count("queue_capacity")?),
        _ => {
            return Err(ConfigError::Invalid {
                field: "sweep.parameter",
                reason: format!("unknown parameter {}", param_name),
            });
        }
    }
    Ok(())
}

fn format_mean(stats: &Option<MeanStd>) -> String {
    stats
        .as_ref()
        .map(|s| format!("{:.3} ± {:.3}", s.mean, s.std))
        .unwrap_or_else(|| "N/A".to_string())
}

fn print_aggregate_summary(aggregate: &AggregateMetrics) {
    println!(
        "Successful runs: {}/{}",
        aggregate.successful_runs, aggregate.num_runs
    );
    println!(
        "Runs with no finished customers: {}",
        aggregate.runs_without_samples
    );
    println!("Finished customers: {}", format_mean(&aggregate.finished));
    println!("Lost customers: {}", format_mean(&aggregate.lost));
    println!("Loss rate: {}", format_mean(&aggregate.loss_rate));
    println!(
        "Final queue size: {}",
        format_mean(&aggregate.final_queue_size)
    );
    println!(
        "Mean waiting time: {}",
        format_mean(&aggregate.mean_waiting_time)
    );
    println!(
        "Mean service time: {}",
        format_mean(&aggregate.mean_service_time)
    );
    println!(
        "Mean time in system: {}",
        format_mean(&aggregate.mean_sojourn_time)
    );
}
