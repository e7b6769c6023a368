//! Driving a service center through a fixed number of minutes
//!
//! `ServiceCenter` is the agent: each tick it draws the minute's arrivals
//! and hands them to its queue together with its own `ServiceStats`.
//! `Simulation` wires a center into a `tick::TickLoop` and turns the final
//! state into a `SimulationReport`.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tick::{Agent, TickLoop};

use crate::config::ModelConfig;
use crate::error::SimulationError;
use crate::service_queue::ServiceQueue;
use crate::stats::ServiceStats;
use crate::worker::Worker;
use crate::workload::{RandomSource, SeededNormalSource, WorkloadGenerator};

/// Final per-worker numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub id: usize,
    pub rate_per_minute: f64,
    pub completed: usize,
    pub work_done: f64,
    /// Share of the worker's total capacity actually used; `None` for a
    /// zero-rate worker or a run of zero minutes
    pub utilisation: Option<f64>,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub seed: Option<u64>,
    pub minutes_run: usize,
    pub arrivals: usize,
    pub admitted: usize,
    pub finished: usize,
    pub lost: usize,
    pub queue_size: usize,
    pub in_service: usize,
    pub mean_waiting_time: Option<f64>,
    pub mean_service_time: Option<f64>,
    pub mean_sojourn_time: Option<f64>,
    pub max_waiting_time: Option<usize>,
    pub workers: Vec<WorkerSummary>,
    /// Set when the run stopped early because a draw failed
    pub error: Option<String>,
}

impl SimulationReport {
    /// Report for a run that never started
    pub fn failed(seed: Option<u64>, reason: String) -> Self {
        SimulationReport {
            seed,
            minutes_run: 0,
            arrivals: 0,
            admitted: 0,
            finished: 0,
            lost: 0,
            queue_size: 0,
            in_service: 0,
            mean_waiting_time: None,
            mean_service_time: None,
            mean_sojourn_time: None,
            max_waiting_time: None,
            workers: Vec::new(),
            error: Some(reason),
        }
    }

    /// arrivals = admitted + lost, and admitted = finished + waiting + in service
    pub fn is_conserved(&self) -> bool {
        self.arrivals == self.admitted + self.lost
            && self.admitted == self.finished + self.queue_size + self.in_service
    }

    pub fn loss_rate(&self) -> Option<f64> {
        if self.arrivals == 0 {
            return None;
        }
        Some(self.lost as f64 / self.arrivals as f64)
    }

    pub fn has_samples(&self) -> bool {
        self.mean_service_time.is_some()
    }
}

pub struct ServiceCenter<R> {
    generator: WorkloadGenerator<R>,
    queue: ServiceQueue,
    stats: ServiceStats,
    seed: Option<u64>,
    minutes_run: usize,
    failure: Option<(usize, SimulationError)>,
}

impl<R: RandomSource> ServiceCenter<R> {
    /// Draws one rate per server up front; the rates never change afterwards
    pub fn new(config: &ModelConfig, source: R) -> Result<Self, SimulationError> {
        let mut generator = WorkloadGenerator::new(config, source);
        let workers = generator
            .server_rates(config.num_servers)?
            .into_iter()
            .enumerate()
            .map(|(id, rate)| Worker::new(id, rate))
            .collect();

        Ok(ServiceCenter {
            generator,
            queue: ServiceQueue::new(workers, config.queue_capacity),
            stats: ServiceStats::new(),
            seed: None,
            minutes_run: 0,
            failure: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// One minute: arrivals, admission, service
    pub fn step(&mut self, now: usize) -> Result<(), SimulationError> {
        let customers = self.generator.new_customers(now)?;
        self.queue.process(customers, now, &mut self.stats);
        self.minutes_run = now + 1;
        Ok(())
    }

    pub fn queue(&self) -> &ServiceQueue {
        &self.queue
    }

    pub fn service_stats(&self) -> &ServiceStats {
        &self.stats
    }

    pub fn minutes_run(&self) -> usize {
        self.minutes_run
    }

    pub fn failure(&self) -> Option<&(usize, SimulationError)> {
        self.failure.as_ref()
    }

    pub fn report(&self) -> SimulationReport {
        let minutes = self.minutes_run;
        let workers = self
            .queue
            .workers()
            .iter()
            .map(|w| {
                let capacity = w.rate_per_minute() * minutes as f64;
                WorkerSummary {
                    id: w.id(),
                    rate_per_minute: w.rate_per_minute(),
                    completed: w.completed_count(),
                    work_done: w.work_done_total(),
                    utilisation: (capacity > 0.0).then(|| w.work_done_total() / capacity),
                }
            })
            .collect();

        SimulationReport {
            seed: self.seed,
            minutes_run: minutes,
            arrivals: self.queue.arrival_count(),
            admitted: self.queue.admitted_count(),
            finished: self.stats.finished(),
            lost: self.queue.lost_count(),
            queue_size: self.queue.len(),
            in_service: self.queue.in_service(),
            mean_waiting_time: self.stats.mean_waiting_time().ok(),
            mean_service_time: self.stats.mean_service_time().ok(),
            mean_sojourn_time: self.stats.mean_sojourn_time().ok(),
            max_waiting_time: self.stats.max_waiting_time(),
            workers,
            error: self
                .failure
                .as_ref()
                .map(|(minute, e)| format!("minute {}: {}", minute, e)),
        }
    }
}

impl<R: RandomSource> Agent<SimulationReport> for ServiceCenter<R> {
    fn tick(&mut self, current_t: usize) {
        if self.failure.is_some() {
            return;
        }
        if let Err(e) = self.step(current_t) {
            error!("[{}] Simulation halted: {}", current_t, e);
            self.failure = Some((current_t, e));
        }
    }

    fn stats(&self) -> SimulationReport {
        self.report()
    }
}

/// A configured run over `config.simulation_minutes()` ticks
pub struct Simulation {
    tick_loop: TickLoop<SimulationReport>,
    minutes: usize,
}

impl Simulation {
    pub fn new<R>(config: &ModelConfig, source: R) -> Result<Self, SimulationError>
    where
        R: RandomSource + 'static,
    {
        config.validate()?;
        let center = ServiceCenter::new(config, source)?;
        Ok(Self::from_center(center, config.simulation_minutes()))
    }

    /// Seeded from `config.seed`
    pub fn seeded(config: &ModelConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let center = ServiceCenter::new(config, SeededNormalSource::new(config.seed))?
            .with_seed(config.seed);
        Ok(Self::from_center(center, config.simulation_minutes()))
    }

    /// Run an already built center for `minutes` ticks
    pub fn from_center<R>(center: ServiceCenter<R>, minutes: usize) -> Self
    where
        R: RandomSource + 'static,
    {
        let agents: Vec<Box<dyn Agent<SimulationReport>>> = vec![Box::new(center)];
        Simulation {
            tick_loop: TickLoop::new(agents),
            minutes,
        }
    }

    pub fn minutes(&self) -> usize {
        self.minutes
    }

    pub fn into_tick_loop(self) -> TickLoop<SimulationReport> {
        self.tick_loop
    }

    /// Run to the configured end and report. A failed draw surfaces as
    /// `SimulationError::Halted`; an empty run is not an error.
    pub fn run(mut self) -> Result<SimulationReport, SimulationError> {
        info!("Running service center for {} minutes", self.minutes);
        self.tick_loop.run(self.minutes);

        let report = self
            .tick_loop
            .stats()
            .into_iter()
            .next()
            .ok_or(SimulationError::MissingReport)?;

        if let Some(reason) = &report.error {
            return Err(SimulationError::Halted {
                reason: reason.clone(),
            });
        }

        if !report.has_samples() {
            warn!(
                "No customer finished in {} minutes; waiting and service means are unavailable",
                report.minutes_run
            );
        }
        info!(
            "Finished {} of {} arrivals, {} lost, {} still waiting",
            report.finished, report.arrivals, report.lost, report.queue_size
        );
        Ok(report)
    }
}
