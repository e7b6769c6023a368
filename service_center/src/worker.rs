use log::debug;

use crate::customer::Customer;
use crate::stats::ServiceStats;

/// A server with a fixed per-minute work budget
///
/// The budget is reset lazily: the first `process` call in a new minute
/// zeroes `work_done_this_minute`. A worker that never processes in a minute
/// never resets.
#[derive(Debug, Clone)]
pub struct Worker {
    id: usize,
    rate_per_minute: f64,
    work_done_this_minute: f64,
    last_active_minute: Option<usize>,
    assigned: Option<Customer>,
    completed_count: usize,
    work_done_total: f64,
}

impl Worker {
    pub fn new(id: usize, rate_per_minute: f64) -> Self {
        debug_assert!(rate_per_minute >= 0.0, "worker rate must be non-negative");
        Worker {
            id,
            rate_per_minute,
            work_done_this_minute: 0.0,
            last_active_minute: None,
            assigned: None,
            completed_count: 0,
            work_done_total: 0.0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn rate_per_minute(&self) -> f64 {
        self.rate_per_minute
    }

    pub fn work_done_this_minute(&self) -> f64 {
        self.work_done_this_minute
    }

    pub fn last_active_minute(&self) -> Option<usize> {
        self.last_active_minute
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn work_done_total(&self) -> f64 {
        self.work_done_total
    }

    pub fn assigned(&self) -> Option<&Customer> {
        self.assigned.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.assigned.is_none()
    }

    /// True in a minute the worker has not acted in yet, or while budget remains
    pub fn can_work_more(&self, now: usize) -> bool {
        self.last_active_minute != Some(now) || self.work_done_this_minute < self.rate_per_minute
    }

    /// Take ownership of `customer`, stamping its dequeue time.
    /// A busy worker hands the customer straight back.
    pub fn assign(
        &mut self,
        mut customer: Customer,
        now: usize,
        stats: &mut ServiceStats,
    ) -> Result<(), Customer> {
        if !self.is_idle() {
            return Err(customer);
        }
        customer.mark_dequeued(now, stats);
        debug!(
            "[{}] Worker {} took customer {} ({:.2} units)",
            now,
            self.id,
            customer.id(),
            customer.total_work()
        );
        self.assigned = Some(customer);
        Ok(())
    }

    fn start_minute(&mut self, now: usize) {
        self.work_done_this_minute = 0.0;
        self.last_active_minute = Some(now);
    }

    /// Spend as much of this minute's remaining budget as the current
    /// customer needs. Releases the customer once it is finished.
    pub fn process(&mut self, now: usize, stats: &mut ServiceStats) {
        if self.is_idle() {
            return;
        }
        if self.last_active_minute != Some(now) {
            self.start_minute(now);
        }

        let rate = self.rate_per_minute;
        let budget = (rate - self.work_done_this_minute).max(0.0);
        let Some(customer) = self.assigned.as_mut() else {
            return;
        };

        let needed = customer.work_remaining().max(0.0);
        let budget_limited = needed >= budget;
        let work_to_do = if budget_limited { budget } else { needed };
        let fraction = if rate > 0.0 { work_to_do / rate } else { 0.0 };

        let remaining = customer.help(work_to_do, now, fraction, stats);

        // Pin to the rate when the budget is exhausted so float rounding can
        // never leave a sliver that keeps the worker looping.
        self.work_done_this_minute = if budget_limited {
            rate
        } else {
            (self.work_done_this_minute + work_to_do).min(rate)
        };
        self.work_done_total += work_to_do;

        if remaining <= 0.0 {
            self.assigned = None;
            self.completed_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assigned_worker(rate: f64, work: f64, stats: &mut ServiceStats) -> Worker {
        let mut worker = Worker::new(0, rate);
        worker.assign(Customer::new(0, work, 0), 0, stats).unwrap();
        worker
    }

    #[test]
    fn new_worker_is_idle_and_can_work() {
        let worker = Worker::new(3, 10.0);
        assert!(worker.is_idle());
        assert!(worker.can_work_more(0));
        assert_eq!(worker.id(), 3);
    }

    #[test]
    fn busy_worker_refuses_assignment() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(10.0, 5.0, &mut stats);

        let rejected = worker.assign(Customer::new(1, 2.0, 0), 0, &mut stats);

        assert_eq!(rejected.unwrap_err().id(), 1);
        assert_eq!(worker.assigned().unwrap().id(), 0);
        assert_eq!(stats.waiting_times().len(), 1);
    }

    #[test]
    fn process_while_idle_is_noop() {
        let mut stats = ServiceStats::new();
        let mut worker = Worker::new(0, 5.0);

        worker.process(4, &mut stats);

        assert_eq!(worker.last_active_minute(), None);
        assert_eq!(worker.work_done_this_minute(), 0.0);
    }

    #[test]
    fn work_is_capped_by_budget() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(5.0, 12.0, &mut stats);

        worker.process(0, &mut stats);

        assert_eq!(worker.work_done_this_minute(), 5.0);
        assert_eq!(worker.assigned().unwrap().work_remaining(), 7.0);
        assert!(!worker.can_work_more(0));
        assert!(worker.can_work_more(1));
    }

    #[test]
    fn budget_resets_on_first_process_of_new_minute() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(5.0, 12.0, &mut stats);

        worker.process(0, &mut stats);
        worker.process(1, &mut stats);

        assert_eq!(worker.last_active_minute(), Some(1));
        assert_eq!(worker.work_done_this_minute(), 5.0);
        assert_eq!(worker.assigned().unwrap().work_remaining(), 2.0);
    }

    #[test]
    fn repeated_process_in_same_minute_does_nothing_once_budget_spent() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(5.0, 12.0, &mut stats);

        worker.process(0, &mut stats);
        worker.process(0, &mut stats);

        assert_eq!(worker.assigned().unwrap().work_remaining(), 7.0);
        assert_eq!(worker.work_done_total(), 5.0);
    }

    #[test]
    fn finishing_releases_customer_and_keeps_leftover_budget() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(10.0, 4.0, &mut stats);

        worker.process(0, &mut stats);

        assert!(worker.is_idle());
        assert_eq!(worker.completed_count(), 1);
        assert_eq!(worker.work_done_this_minute(), 4.0);
        assert!(worker.can_work_more(0));
        assert_relative_eq!(stats.service_times()[0], 0.4);
    }

    #[test]
    fn second_customer_in_same_minute_uses_only_leftover_budget() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(10.0, 4.0, &mut stats);
        worker.process(0, &mut stats);

        worker.assign(Customer::new(1, 9.0, 0), 0, &mut stats).unwrap();
        worker.process(0, &mut stats);

        assert_eq!(worker.work_done_this_minute(), 10.0);
        assert_eq!(worker.assigned().unwrap().work_remaining(), 3.0);
        assert!(!worker.can_work_more(0));
    }

    #[test]
    fn zero_rate_worker_never_finishes() {
        let mut stats = ServiceStats::new();
        let mut worker = assigned_worker(0.0, 1.0, &mut stats);

        for minute in 0..100 {
            worker.process(minute, &mut stats);
            assert!(!worker.can_work_more(minute));
        }

        assert!(!worker.is_idle());
        assert_eq!(worker.assigned().unwrap().work_remaining(), 1.0);
        assert_eq!(stats.finished(), 0);
    }

    #[test]
    fn fractional_rates_never_overshoot_budget() {
        let mut stats = ServiceStats::new();
        let mut worker = Worker::new(0, 0.3);
        let mut next_id = 0;

        for minute in 0..50 {
            while worker.can_work_more(minute) {
                if worker.is_idle() {
                    worker
                        .assign(Customer::new(next_id, 0.1, minute), minute, &mut stats)
                        .unwrap();
                    next_id += 1;
                }
                worker.process(minute, &mut stats);
                assert!(worker.work_done_this_minute() <= worker.rate_per_minute());
            }
        }

        assert!(stats.finished() >= 100);
    }
}
