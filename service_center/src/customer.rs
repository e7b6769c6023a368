use log::{debug, warn};

use crate::stats::ServiceStats;

/// One arrival: its workload and when it entered and left the queue
///
/// A customer moves Pending -> InService -> Done. Only the worker holding
/// it mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    id: usize,
    total_work: f64,
    work_remaining: f64,
    enqueued_at: usize,
    dequeued_at: Option<usize>,
    finished: bool,
}

impl Customer {
    pub fn new(id: usize, total_work: f64, enqueued_at: usize) -> Self {
        Customer {
            id,
            total_work,
            work_remaining: total_work,
            enqueued_at,
            dequeued_at: None,
            finished: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn total_work(&self) -> f64 {
        self.total_work
    }

    pub fn work_remaining(&self) -> f64 {
        self.work_remaining
    }

    pub fn enqueued_at(&self) -> usize {
        self.enqueued_at
    }

    pub fn dequeued_at(&self) -> Option<usize> {
        self.dequeued_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record the minute a worker took this customer and its waiting time.
    /// Only the first call counts.
    pub fn mark_dequeued(&mut self, now: usize, stats: &mut ServiceStats) {
        if let Some(dequeued_at) = self.dequeued_at {
            warn!(
                "[{}] Customer {} already dequeued at {}, ignoring",
                now, self.id, dequeued_at
            );
            return;
        }
        self.dequeued_at = Some(now);
        stats.record_wait(now.saturating_sub(self.enqueued_at));
    }

    /// Apply `amount` units of work. `fraction_of_minute` is the part of
    /// minute `now` the work took; it is credited to the service time if this
    /// call finishes the customer.
    ///
    /// Completion is recorded once, on the first drop to <= 0. Later calls
    /// keep decrementing but record nothing.
    pub fn help(
        &mut self,
        amount: f64,
        now: usize,
        fraction_of_minute: f64,
        stats: &mut ServiceStats,
    ) -> f64 {
        self.work_remaining -= amount;

        if self.work_remaining <= 0.0 && !self.finished {
            self.finished = true;
            let started = self.dequeued_at.unwrap_or(self.enqueued_at);
            let service_time = now.saturating_sub(started) as f64 + fraction_of_minute;
            let sojourn_time = now.saturating_sub(self.enqueued_at) as f64 + fraction_of_minute;
            stats.record_completion(service_time, sojourn_time);
            debug!(
                "[{}] Customer {} finished after {:.2} minutes of service",
                now, self.id, service_time
            );
        }

        self.work_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn waiting_time_recorded_at_dequeue_not_enqueue() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 10.0, 3);
        assert!(stats.waiting_times().is_empty());

        customer.mark_dequeued(7, &mut stats);

        assert_eq!(customer.dequeued_at(), Some(7));
        assert_eq!(stats.waiting_times(), &[4]);
    }

    #[test]
    fn second_dequeue_is_ignored() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 10.0, 0);

        customer.mark_dequeued(1, &mut stats);
        customer.mark_dequeued(5, &mut stats);

        assert_eq!(customer.dequeued_at(), Some(1));
        assert_eq!(stats.waiting_times(), &[1]);
    }

    #[test]
    fn partial_help_records_nothing() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 12.0, 0);
        customer.mark_dequeued(0, &mut stats);

        let remaining = customer.help(5.0, 0, 1.0, &mut stats);

        assert_eq!(remaining, 7.0);
        assert!(!customer.is_finished());
        assert_eq!(stats.finished(), 0);
    }

    #[test]
    fn completion_credits_fraction_of_final_minute() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 12.0, 0);
        customer.mark_dequeued(0, &mut stats);

        customer.help(5.0, 0, 1.0, &mut stats);
        customer.help(5.0, 1, 1.0, &mut stats);
        let remaining = customer.help(2.0, 2, 0.4, &mut stats);

        assert_eq!(remaining, 0.0);
        assert!(customer.is_finished());
        assert_eq!(stats.finished(), 1);
        assert_relative_eq!(stats.service_times()[0], 2.4);
    }

    #[test]
    fn service_time_starts_at_dequeue() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 4.0, 2);
        customer.mark_dequeued(5, &mut stats);

        customer.help(4.0, 6, 0.5, &mut stats);

        assert_relative_eq!(stats.service_times()[0], 1.5);
        assert_relative_eq!(stats.sojourn_times()[0], 4.5);
    }

    #[test]
    fn completion_is_recorded_exactly_once() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 3.0, 0);
        customer.mark_dequeued(0, &mut stats);

        customer.help(3.0, 0, 0.3, &mut stats);
        customer.help(1.0, 1, 0.1, &mut stats);
        customer.help(0.0, 2, 0.0, &mut stats);

        assert_eq!(stats.finished(), 1);
        assert_eq!(stats.service_times().len(), 1);
        assert_eq!(customer.work_remaining(), -1.0);
    }

    #[test]
    fn zero_workload_finishes_on_first_help() {
        let mut stats = ServiceStats::new();
        let mut customer = Customer::new(0, 0.0, 0);
        customer.mark_dequeued(0, &mut stats);

        customer.help(0.0, 0, 0.0, &mut stats);

        assert!(customer.is_finished());
        assert_eq!(stats.finished(), 1);
        assert_eq!(stats.service_times(), &[0.0]);
    }
}
