//! Single-queue, multi-server service center in one-minute ticks
//!
//! Customers arrive each minute with a random amount of work, wait in a
//! bounded FIFO queue, and are served by workers with a random per-minute
//! throughput.
//!
//! Key pieces:
//! - WorkloadGenerator: arrivals, workloads and server rates from an injected
//!   `RandomSource`
//! - ServiceQueue: admission control and per-minute assignment of workers
//! - Worker: per-minute work budget, lazily reset
//! - ServiceCenter / Simulation: the `tick::Agent` and its driver
//! - MonteCarlo: independent seeded runs in parallel
//!
//! Waiting time runs from arrival to assignment. Service time runs from
//! assignment to completion and credits the fraction of the final minute
//! actually used. Sojourn time is their sum.

pub mod batch;
pub mod config;
pub mod customer;
pub mod error;
pub mod output;
pub mod service_queue;
pub mod simulation;
pub mod stats;
pub mod worker;
pub mod workload;

pub use batch::{MonteCarlo, RunOutcome};
pub use config::ModelConfig;
pub use customer::Customer;
pub use error::{ConfigError, OutputError, SimulationError, StatsError};
pub use service_queue::ServiceQueue;
pub use simulation::{ServiceCenter, Simulation, SimulationReport, WorkerSummary};
pub use stats::ServiceStats;
pub use worker::Worker;
pub use workload::{RandomSource, ScriptedSource, SeededNormalSource, WorkloadGenerator};
