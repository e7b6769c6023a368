//! Per-run statistics sink
//!
//! One `ServiceStats` belongs to one run. The engine receives it by `&mut`
//! and appends samples as customers are assigned and completed.

use crate::error::StatsError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceStats {
    /// Minutes between arrival and assignment, one per assigned customer
    waiting_times: Vec<usize>,
    /// Minutes between assignment and completion, with fractional credit
    service_times: Vec<f64>,
    /// Minutes between arrival and completion (waiting + service)
    sojourn_times: Vec<f64>,
    finished: usize,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_wait(&mut self, waiting_time: usize) {
        self.waiting_times.push(waiting_time);
    }

    pub fn record_completion(&mut self, service_time: f64, sojourn_time: f64) {
        self.service_times.push(service_time);
        self.sojourn_times.push(sojourn_time);
        self.finished += 1;
    }

    pub fn finished(&self) -> usize {
        self.finished
    }

    pub fn waiting_times(&self) -> &[usize] {
        &self.waiting_times
    }

    pub fn service_times(&self) -> &[f64] {
        &self.service_times
    }

    pub fn sojourn_times(&self) -> &[f64] {
        &self.sojourn_times
    }

    pub fn mean_waiting_time(&self) -> Result<f64, StatsError> {
        mean(
            self.waiting_times.iter().map(|&w| w as f64),
            "waiting time",
        )
    }

    pub fn mean_service_time(&self) -> Result<f64, StatsError> {
        mean(self.service_times.iter().copied(), "service time")
    }

    pub fn mean_sojourn_time(&self) -> Result<f64, StatsError> {
        mean(self.sojourn_times.iter().copied(), "sojourn time")
    }

    pub fn max_waiting_time(&self) -> Option<usize> {
        self.waiting_times.iter().copied().max()
    }
}

fn mean(samples: impl Iterator<Item = f64>, statistic: &'static str) -> Result<f64, StatsError> {
    let (sum, count) = samples.fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    if count == 0 {
        return Err(StatsError::NoSamples { statistic });
    }
    Ok(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_stats_report_no_samples() {
        let stats = ServiceStats::new();

        assert_eq!(stats.finished(), 0);
        assert_eq!(
            stats.mean_waiting_time(),
            Err(StatsError::NoSamples {
                statistic: "waiting time"
            })
        );
        assert!(stats.mean_service_time().is_err());
        assert!(stats.mean_sojourn_time().is_err());
        assert_eq!(stats.max_waiting_time(), None);
    }

    #[test]
    fn means_over_recorded_samples() {
        let mut stats = ServiceStats::new();
        stats.record_wait(0);
        stats.record_wait(1);
        stats.record_wait(2);
        stats.record_completion(1.0, 1.0);
        stats.record_completion(2.4, 3.4);

        assert_relative_eq!(stats.mean_waiting_time().unwrap(), 1.0);
        assert_relative_eq!(stats.mean_service_time().unwrap(), 1.7);
        assert_relative_eq!(stats.mean_sojourn_time().unwrap(), 2.2);
        assert_eq!(stats.max_waiting_time(), Some(2));
        assert_eq!(stats.finished(), 2);
    }

    #[test]
    fn waits_can_exist_without_completions() {
        let mut stats = ServiceStats::new();
        stats.record_wait(4);

        assert_relative_eq!(stats.mean_waiting_time().unwrap(), 4.0);
        assert!(stats.mean_service_time().is_err());
    }
}
