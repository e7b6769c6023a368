//! Monte Carlo batches: many independent seeded runs of one config
//!
//! Run `i` uses seed `base_seed + i` and owns its own queue, workers, stats
//! and random source, so a batch gives the same results on any number of
//! threads.

use log::info;
use tick::parallel::{ParallelRunner, simple_progress_reporter};
use tick::{Agent, TickLoop};

use crate::config::ModelConfig;
use crate::error::SimulationError;
use crate::simulation::{Simulation, SimulationReport};

/// Stand-in agent for a run that could not be built
struct FailedRun {
    seed: u64,
    reason: String,
}

impl Agent<SimulationReport> for FailedRun {
    fn stats(&self) -> SimulationReport {
        SimulationReport::failed(Some(self.seed), self.reason.clone())
    }
}

/// Tick loop for one run of `config` with its seed replaced by `seed`
pub fn build_run(config: &ModelConfig, seed: u64) -> TickLoop<SimulationReport> {
    let config = ModelConfig {
        seed,
        ..config.clone()
    };
    match Simulation::seeded(&config) {
        Ok(simulation) => simulation.into_tick_loop(),
        Err(e) => {
            let agents: Vec<Box<dyn Agent<SimulationReport>>> = vec![Box::new(FailedRun {
                seed,
                reason: e.to_string(),
            })];
            TickLoop::new(agents)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: usize,
    pub seed: u64,
    pub result: Result<SimulationReport, String>,
}

#[derive(Debug, Clone)]
pub struct MonteCarlo {
    config: ModelConfig,
    num_runs: usize,
    base_seed: u64,
    num_threads: Option<usize>,
    progress_interval: Option<usize>,
}

impl MonteCarlo {
    pub fn new(config: ModelConfig, num_runs: usize, base_seed: u64) -> Self {
        MonteCarlo {
            config,
            num_runs,
            base_seed,
            num_threads: None,
            progress_interval: None,
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Print progress every `interval` finished runs
    pub fn progress(mut self, interval: usize) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    pub fn seed_for(&self, run_id: usize) -> u64 {
        self.base_seed + run_id as u64
    }

    /// Run the whole batch. Fails only if the config itself is invalid;
    /// individual run failures come back inside each `RunOutcome`.
    pub fn run(&self) -> Result<Vec<RunOutcome>, SimulationError> {
        self.config.validate()?;
        info!(
            "Running {} runs of {} minutes from seed {}",
            self.num_runs,
            self.config.simulation_minutes(),
            self.base_seed
        );

        let config = &self.config;
        let base_seed = self.base_seed;
        let mut runner =
            ParallelRunner::new(self.num_runs, move |run_id| build_run(config, base_seed + run_id as u64));
        if let Some(n) = self.num_threads {
            runner = runner.num_threads(n);
        }
        if let Some(interval) = self.progress_interval {
            runner = runner.progress(simple_progress_reporter(interval));
        }

        let results = runner.run(self.config.simulation_minutes());

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(run_id, result)| {
                let result = result.and_then(|reports| {
                    let report = reports
                        .into_iter()
                        .next()
                        .ok_or_else(|| "run produced no report".to_string())?;
                    match &report.error {
                        Some(reason) => Err(reason.clone()),
                        None => Ok(report),
                    }
                });
                RunOutcome {
                    run_id,
                    seed: self.seed_for(run_id),
                    result,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> ModelConfig {
        ModelConfig {
            hours_to_run: 1,
            ..ModelConfig::baseline()
        }
    }

    #[test]
    fn runs_are_ordered_and_seeded_by_index() {
        let outcomes = MonteCarlo::new(short_config(), 6, 100).run().unwrap();

        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.run_id, i);
            assert_eq!(outcome.seed, 100 + i as u64);
            let report = outcome.result.as_ref().unwrap();
            assert_eq!(report.seed, Some(100 + i as u64));
            assert!(report.is_conserved());
        }
    }

    #[test]
    fn batch_matches_single_seeded_run() {
        let outcomes = MonteCarlo::new(short_config(), 3, 7).run().unwrap();

        let config = ModelConfig {
            seed: 8,
            ..short_config()
        };
        let single = Simulation::seeded(&config).unwrap().run().unwrap();

        assert_eq!(outcomes[1].result.as_ref().unwrap(), &single);
    }

    #[test]
    fn thread_count_does_not_change_results() {
        let one = MonteCarlo::new(short_config(), 8, 1).num_threads(1).run().unwrap();
        let four = MonteCarlo::new(short_config(), 8, 1).num_threads(4).run().unwrap();
        assert_eq!(one, four);
    }

    #[test]
    fn invalid_config_fails_whole_batch() {
        let mut config = short_config();
        config.workload_std_dev = -3.0;
        assert!(MonteCarlo::new(config, 4, 0).run().is_err());
    }

    #[test]
    fn unbuildable_run_is_reported_not_panicked() {
        let mut config = short_config();
        config.hours_to_run = 0;

        let tick_loop = build_run(&config, 5);
        let reports = tick_loop.stats();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].seed, Some(5));
        assert!(reports[0].error.is_some());
    }
}
