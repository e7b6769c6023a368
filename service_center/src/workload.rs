//! Stochastic inputs: arrivals per minute, customer workloads, server rates
//!
//! Every quantity is the absolute value of a normal draw. Folding negatives
//! this way keeps counts and magnitudes non-negative at the cost of pushing
//! the effective mean above the configured one.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::config::ModelConfig;
use crate::customer::Customer;
use crate::error::SimulationError;

/// Capability to sample `count` values from Normal(mean, sd)
pub trait RandomSource {
    fn normal(&mut self, mean: f64, sd: f64, count: usize) -> Result<Vec<f64>, SimulationError>;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn normal(&mut self, mean: f64, sd: f64, count: usize) -> Result<Vec<f64>, SimulationError> {
        (**self).normal(mean, sd, count)
    }
}

/// `StdRng` seeded from a `u64`: same seed, same draws
pub struct SeededNormalSource {
    rng: StdRng,
}

impl SeededNormalSource {
    pub fn new(seed: u64) -> Self {
        SeededNormalSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededNormalSource {
    fn normal(&mut self, mean: f64, sd: f64, count: usize) -> Result<Vec<f64>, SimulationError> {
        let normal = Normal::new(mean, sd)
            .map_err(|source| SimulationError::Distribution { mean, sd, source })?;
        Ok((0..count).map(|_| normal.sample(&mut self.rng)).collect())
    }
}

/// Replays a fixed list of draws, ignoring the distribution parameters.
/// Once the script runs out every draw is `0.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: VecDeque<f64>,
}

impl ScriptedSource {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        ScriptedSource {
            draws: draws.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedSource {
    fn normal(&mut self, _mean: f64, _sd: f64, count: usize) -> Result<Vec<f64>, SimulationError> {
        Ok((0..count)
            .map(|_| self.draws.pop_front().unwrap_or(0.0))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NormalParams {
    mean: f64,
    sd: f64,
}

pub struct WorkloadGenerator<R> {
    source: R,
    arrival_rate: NormalParams,
    workload: NormalParams,
    server_rate: NormalParams,
    next_customer_id: usize,
}

impl<R: RandomSource> WorkloadGenerator<R> {
    pub fn new(config: &ModelConfig, source: R) -> Self {
        WorkloadGenerator {
            source,
            arrival_rate: NormalParams {
                mean: config.arrival_rate_mean,
                sd: config.arrival_rate_std_dev,
            },
            workload: NormalParams {
                mean: config.workload_mean,
                sd: config.workload_std_dev,
            },
            server_rate: NormalParams {
                mean: config.server_rate_mean,
                sd: config.server_rate_std_dev,
            },
            next_customer_id: 0,
        }
    }

    fn folded(&mut self, params: NormalParams, count: usize) -> Result<Vec<f64>, SimulationError> {
        let draws = self.source.normal(params.mean, params.sd, count)?;
        Ok(draws.into_iter().map(f64::abs).collect())
    }

    /// Customers arriving this minute: one draw, truncated toward zero
    pub fn arrival_count(&mut self) -> Result<usize, SimulationError> {
        let draws = self.source.normal(self.arrival_rate.mean, self.arrival_rate.sd, 1)?;
        Ok(draws.first().map_or(0, |draw| draw.trunc().abs() as usize))
    }

    pub fn workload_sample(&mut self, n: usize) -> Result<Vec<f64>, SimulationError> {
        self.folded(self.workload, n)
    }

    pub fn server_rates(&mut self, n: usize) -> Result<Vec<f64>, SimulationError> {
        self.folded(self.server_rate, n)
    }

    /// This minute's arrivals, in arrival order, each stamped with `now`
    pub fn new_customers(&mut self, now: usize) -> Result<Vec<Customer>, SimulationError> {
        let count = self.arrival_count()?;
        let workloads = self.workload_sample(count)?;
        let customers = workloads
            .into_iter()
            .map(|work| {
                let id = self.next_customer_id;
                self.next_customer_id += 1;
                Customer::new(id, work, now)
            })
            .collect();
        Ok(customers)
    }

    pub fn customers_generated(&self) -> usize {
        self.next_customer_id
    }
}
