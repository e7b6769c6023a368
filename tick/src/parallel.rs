//! Parallel execution of independent TickLoop runs
//!
//! Monte Carlo batches are many runs of the same model with different seeds.
//! Each run gets its own `TickLoop`, built inside the worker thread from a
//! `run_id`, so nothing is shared between runs.
//!
//! # Example
//!
//! ```rust
//! use tick::parallel::{ParallelRunner, simple_progress_reporter};
//! use tick::{Agent, TickLoop};
//!
//! struct Counter {
//!     seed: u64,
//!     ticks: usize,
//! }
//!
//! impl Agent<(u64, usize)> for Counter {
//!     fn tick(&mut self, _current_t: usize) {
//!         self.ticks += 1;
//!     }
//!     fn stats(&self) -> (u64, usize) {
//!         (self.seed, self.ticks)
//!     }
//! }
//!
//! let results = ParallelRunner::new(20, |run_id| {
//!     let agents: Vec<Box<dyn Agent<(u64, usize)>>> = vec![Box::new(Counter {
//!         seed: 42 + run_id as u64,
//!         ticks: 0,
//!     })];
//!     TickLoop::new(agents)
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(4)
//! .run(480);
//!
//! assert_eq!(results.len(), 20);
//! assert_eq!(results[3].as_ref().unwrap()[0], (45, 480));
//! ```
//!
//! # Determinism
//!
//! Results come back in `run_id` order. Provided the builder derives its seed
//! from `run_id`, two batches with the same size produce identical results
//! whatever the thread count.
//!
//! # Panics
//!
//! A panic inside one run is caught and reported as `Err(String)` for that
//! run. The other runs are unaffected.

use crate::TickLoop;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Executes many independent `TickLoop` runs on a rayon pool
pub struct ParallelRunner<S, F>
where
    F: Fn(usize) -> TickLoop<S> + Send + Sync,
    S: Send,
{
    num_runs: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
    _stats: PhantomData<fn() -> S>,
}

impl<S, F> ParallelRunner<S, F>
where
    F: Fn(usize) -> TickLoop<S> + Send + Sync,
    S: Send,
{
    /// `builder` is called once per run with the run's id in `0..num_runs`
    pub fn new(num_runs: usize, builder: F) -> Self {
        ParallelRunner {
            num_runs,
            builder,
            num_threads: None,
            progress_callback: None,
            _stats: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global pool
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each run finishes
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run every scenario for ticks `0..run_until` and collect agent stats
    ///
    /// If a dedicated pool was requested but cannot be built, the global pool
    /// is used instead.
    pub fn run(self, run_until: usize) -> Vec<Result<Vec<S>, String>> {
        let completed = AtomicUsize::new(0);

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .ok()
        });

        let execute = || {
            (0..self.num_runs)
                .into_par_iter()
                .map(|run_id| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut tick_loop = (self.builder)(run_id);
                        tick_loop.run(run_until);
                        tick_loop.stats()
                    }));

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = &self.progress_callback {
                        callback(done, self.num_runs);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        }
                    })
                })
                .collect()
        };

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Shorthand for `ParallelRunner::new(num_runs, builder).run(run_until)`
pub fn run_parallel<S, F>(
    num_runs: usize,
    builder: F,
    run_until: usize,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> TickLoop<S> + Send + Sync,
    S: Send,
{
    ParallelRunner::new(num_runs, builder).run(run_until)
}

/// Run in batches of at most `batch_size` concurrent runs
///
/// Run ids stay global: the builder sees `0..num_runs` exactly as with
/// `run_parallel`, so results match it one for one.
pub fn run_batched<S, F>(
    num_runs: usize,
    batch_size: usize,
    builder: F,
    run_until: usize,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> TickLoop<S> + Send + Sync,
    S: Send,
{
    let mut all_results = Vec::with_capacity(num_runs);

    for batch_start in (0..num_runs).step_by(batch_size.max(1)) {
        let batch_end = (batch_start + batch_size.max(1)).min(num_runs);
        let batch_results = run_parallel(
            batch_end - batch_start,
            |local_id| builder(batch_start + local_id),
            run_until,
        );
        all_results.extend(batch_results);
    }

    all_results
}

/// Prints a line every `interval` completed runs, and on the last one
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            println!("  Completed {}/{} runs", completed, total);
        }
    }
}
