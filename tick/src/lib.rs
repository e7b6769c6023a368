//! Fixed-step simulation loop
//!
//! Time advances one tick at a time. Every tick, each agent is called once, in
//! the order the agents were registered. There is no event queue: anything an
//! agent needs to do happens inside its own `tick`.

pub mod parallel;

pub trait Agent<S> {
    fn tick(&mut self, _current_t: usize) {}

    fn stats(&self) -> S;
}

pub struct TickLoop<S> {
    current_t: usize,
    agents: Vec<Box<dyn Agent<S>>>,
}

impl<S> TickLoop<S> {
    pub fn new(agents: Vec<Box<dyn Agent<S>>>) -> TickLoop<S> {
        TickLoop {
            current_t: 0,
            agents,
        }
    }

    /// Next tick to be executed (equivalently, the number of ticks already run)
    pub fn current_t(&self) -> usize {
        self.current_t
    }

    fn step(&mut self) {
        for agent in &mut self.agents {
            agent.tick(self.current_t);
        }
        self.current_t += 1;
    }

    /// Run ticks `current_t..until`. Calling again with a larger `until`
    /// resumes where the previous call stopped.
    pub fn run(&mut self, until: usize) {
        while self.current_t < until {
            self.step();
        }
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        id: usize,
        log: Rc<RefCell<Vec<(usize, usize)>>>,
        ticks: usize,
    }

    impl Agent<usize> for Recorder {
        fn tick(&mut self, current_t: usize) {
            self.log.borrow_mut().push((current_t, self.id));
            self.ticks += 1;
        }

        fn stats(&self) -> usize {
            self.ticks
        }
    }

    fn recorders(n: usize, log: &Rc<RefCell<Vec<(usize, usize)>>>) -> Vec<Box<dyn Agent<usize>>> {
        (0..n)
            .map(|id| {
                Box::new(Recorder {
                    id,
                    log: Rc::clone(log),
                    ticks: 0,
                }) as Box<dyn Agent<usize>>
            })
            .collect()
    }

    #[test]
    fn empty_loop_still_advances_time() {
        let mut tick_loop = TickLoop::<u8>::new(vec![]);
        tick_loop.run(5);
        assert_eq!(tick_loop.current_t(), 5);
        assert!(tick_loop.stats().is_empty());
    }

    #[test]
    fn agents_called_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tick_loop = TickLoop::new(recorders(3, &log));

        tick_loop.run(2);

        assert_eq!(
            *log.borrow(),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn run_resumes_from_current_tick() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tick_loop = TickLoop::new(recorders(1, &log));

        tick_loop.run(3);
        tick_loop.run(5);
        // Going backwards is a no-op
        tick_loop.run(2);

        let ticks: Vec<usize> = log.borrow().iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
        assert_eq!(tick_loop.stats(), vec![5]);
    }
}
