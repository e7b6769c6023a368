//! Bounded FIFO queue shared by a fixed set of workers
//!
//! Each minute the queue first admits the new arrivals, turning away whatever
//! does not fit, then lets every worker pull customers from the head until
//! its budget for the minute is spent or the queue runs dry.

use std::collections::VecDeque;

use log::debug;

use crate::customer::Customer;
use crate::stats::ServiceStats;
use crate::worker::Worker;

#[derive(Debug, Clone)]
pub struct ServiceQueue {
    pending: VecDeque<Customer>,
    capacity: Option<usize>,
    workers: Vec<Worker>,
    arrival_count: usize,
    admitted_count: usize,
    lost_count: usize,
}

impl ServiceQueue {
    /// `capacity` of `None` never turns anyone away. Workers are served in
    /// the order given here, every minute.
    pub fn new(workers: Vec<Worker>, capacity: Option<usize>) -> Self {
        ServiceQueue {
            pending: VecDeque::new(),
            capacity,
            workers,
            arrival_count: 0,
            admitted_count: 0,
            lost_count: 0,
        }
    }

    /// Queue as many of `customers` as fit, in arrival order. The rest are
    /// dropped and counted as lost. Returns the number lost.
    pub fn admit(&mut self, mut customers: Vec<Customer>) -> usize {
        let arriving = customers.len();
        let room = match self.capacity {
            Some(capacity) => capacity.saturating_sub(self.pending.len()),
            None => arriving,
        };

        let rejected = arriving.saturating_sub(room);
        if rejected > 0 {
            customers.truncate(room);
            self.lost_count += rejected;
            debug!(
                "Queue full ({} waiting), turned away {} of {} arrivals",
                self.pending.len(),
                rejected,
                arriving
            );
        }

        self.arrival_count += arriving;
        self.admitted_count += customers.len();
        self.pending.extend(customers);
        rejected
    }

    /// Run one minute of service: workers in order, customers strictly FIFO.
    ///
    /// A worker keeps going while it has budget left this minute and either
    /// holds a customer or can take the next one from the queue, so a fast
    /// worker can finish several customers in a single minute.
    pub fn advance(&mut self, now: usize, stats: &mut ServiceStats) {
        for worker in &mut self.workers {
            while worker.can_work_more(now) {
                if worker.is_idle() {
                    let Some(customer) = self.pending.pop_front() else {
                        break;
                    };
                    if let Err(customer) = worker.assign(customer, now, stats) {
                        self.pending.push_front(customer);
                        break;
                    }
                }
                worker.process(now, stats);
            }
        }
    }

    /// Per-minute entry point: admit then advance. Returns the number lost.
    pub fn process(&mut self, customers: Vec<Customer>, now: usize, stats: &mut ServiceStats) -> usize {
        let rejected = self.admit(customers);
        self.advance(now, stats);
        rejected
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn pending(&self) -> impl Iterator<Item = &Customer> {
        self.pending.iter()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Customers currently held by a worker
    pub fn in_service(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_idle()).count()
    }

    pub fn arrival_count(&self) -> usize {
        self.arrival_count
    }

    pub fn admitted_count(&self) -> usize {
        self.admitted_count
    }

    pub fn lost_count(&self) -> usize {
        self.lost_count
    }
}
