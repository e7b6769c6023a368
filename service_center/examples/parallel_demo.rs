//! Demonstration of parallel scenario execution
//!
//! Runs many independent seeded service centers at once with
//! `tick::parallel`, then the same batch through `MonteCarlo`.
//!
//! Run with:
//!   cargo run --release --example parallel_demo -p service_center

use service_center::batch::build_run;
use service_center::{ModelConfig, MonteCarlo};
use tick::parallel::{ParallelRunner, run_parallel, simple_progress_reporter};

fn main() {
    println!("=== Parallel TickLoop Demo ===\n");

    let config = ModelConfig::congested();
    let minutes = config.simulation_minutes();

    // Example 1: Simple parallel execution
    println!("Example 1: Running 10 scenarios in parallel (simple API)");
    let start = std::time::Instant::now();

    let results = run_parallel(10, |run_id| build_run(&config, run_id as u64), minutes);

    println!(
        "Completed {} scenarios in {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    println!(
        "Success rate: {}/{}\n",
        results.iter().filter(|r| r.is_ok()).count(),
        results.len()
    );

    // Example 2: Builder pattern with progress reporting and a fixed pool
    println!("Example 2: Running 100 scenarios on 4 threads");
    let start = std::time::Instant::now();

    let results = ParallelRunner::new(100, |run_id| build_run(&config, 1_000 + run_id as u64))
        .num_threads(4)
        .progress(simple_progress_reporter(25))
        .run(minutes);

    let duration = start.elapsed();
    let reports: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .flat_map(|reports| reports.iter())
        .collect();
    let lost: usize = reports.iter().map(|r| r.lost).sum();
    let arrivals: usize = reports.iter().map(|r| r.arrivals).sum();

    println!("\n=== Aggregate Results ===");
    println!("Total scenarios: {}", results.len());
    println!("Successful: {}", reports.len());
    println!("Elapsed time: {:.2}s", duration.as_secs_f64());
    println!(
        "Throughput: {:.1} scenarios/sec",
        results.len() as f64 / duration.as_secs_f64()
    );
    if arrivals > 0 {
        println!(
            "Customers lost: {} of {} ({:.1}%)",
            lost,
            arrivals,
            100.0 * lost as f64 / arrivals as f64
        );
    }

    // Example 3: the same runs through MonteCarlo, which owns the seeding
    println!("\nExample 3: MonteCarlo with seeds 1000..1100");
    match MonteCarlo::new(config.clone(), 100, 1_000).num_threads(2).run() {
        Ok(outcomes) => {
            let same = outcomes
                .iter()
                .zip(&reports)
                .all(|(o, r)| o.result.as_ref().ok() == Some(*r));
            println!("Identical to Example 2: {}", same);
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
