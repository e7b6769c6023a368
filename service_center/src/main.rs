//! Service center - single run
//!
//! Usage:
//!   cargo run --release -p service_center -- --config configs/congested.toml
//!   RUST_LOG=debug cargo run -p service_center -- --hours 1 --servers 2

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use service_center::{ModelConfig, Simulation, SimulationError, SimulationReport};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Baseline,
    Congested,
}

#[derive(Parser, Debug)]
#[command(about = "Tick-driven single-queue, multi-server service center")]
struct Args {
    /// TOML config file (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in parameter set
    #[arg(long, value_enum, default_value = "baseline")]
    preset: Preset,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Hours to simulate
    #[arg(long)]
    hours: Option<usize>,

    /// Number of servers
    #[arg(long)]
    servers: Option<usize>,

    /// Queue capacity (omit for the config's value)
    #[arg(long, conflicts_with = "unbounded")]
    capacity: Option<usize>,

    /// Remove the queue capacity limit
    #[arg(long)]
    unbounded: bool,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<ModelConfig, SimulationError> {
    let mut config = match &args.config {
        Some(path) => ModelConfig::from_toml_file(path)?,
        None => match args.preset {
            Preset::Baseline => ModelConfig::baseline(),
            Preset::Congested => ModelConfig::congested(),
        },
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(hours) = args.hours {
        config.hours_to_run = hours;
    }
    if let Some(servers) = args.servers {
        config.num_servers = servers;
    }
    if args.unbounded {
        config.queue_capacity = None;
    } else if let Some(capacity) = args.capacity {
        config.queue_capacity = Some(capacity);
    }

    config.validate()?;
    Ok(config)
}

fn format_minutes(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2} minutes", v))
        .unwrap_or_else(|| "N/A (no samples)".to_string())
}

fn print_summary(config: &ModelConfig, report: &SimulationReport) {
    println!("=== Service Center ===\n");

    println!("Configuration:");
    println!(
        "  Arrivals/min: {} ± {}",
        config.arrival_rate_mean, config.arrival_rate_std_dev
    );
    println!(
        "  Work/customer: {} ± {}",
        config.workload_mean, config.workload_std_dev
    );
    println!(
        "  Work/server/min: {} ± {}",
        config.server_rate_mean, config.server_rate_std_dev
    );
    println!("  Servers: {}", config.num_servers);
    match config.queue_capacity {
        Some(capacity) => println!("  Queue capacity: {}", capacity),
        None => println!("  Queue capacity: unbounded"),
    }
    println!(
        "  Duration: {} hours ({} minutes)",
        config.hours_to_run,
        config.simulation_minutes()
    );
    println!("  Seed: {}\n", config.seed);

    println!("=== Results ===\n");
    println!("Customers arrived: {}", report.arrivals);
    println!("Customers finished: {}", report.finished);
    println!("Customers lost: {}", report.lost);
    println!("Customers still in line: {}", report.queue_size);
    println!("Customers in service: {}", report.in_service);
    println!(
        "Average wait time: {}",
        format_minutes(report.mean_waiting_time)
    );
    println!(
        "Average service time: {}",
        format_minutes(report.mean_service_time)
    );
    println!(
        "Average time in system: {}",
        format_minutes(report.mean_sojourn_time)
    );
    if let Some(rate) = report.loss_rate() {
        println!("Loss rate: {:.1}%", rate * 100.0);
    }

    if !report.workers.is_empty() {
        println!("\nServers:");
        for worker in &report.workers {
            let utilisation = worker
                .utilisation
                .map(|u| format!("{:.1}%", u * 100.0))
                .unwrap_or_else(|| "N/A".to_string());
            println!(
                "  Server {}: {:.2} units/min, {} served, utilisation {}",
                worker.id, worker.rate_per_minute, worker.completed, utilisation
            );
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let report = Simulation::seeded(&config)
        .and_then(Simulation::run)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        });

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_summary(&config, &report);
    }
}
