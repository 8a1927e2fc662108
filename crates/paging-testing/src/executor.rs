//! Queue-backed executor for single-threaded, step-by-step tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use paging_core::Executor;

/// An executor that queues tasks until the test drives them explicitly.
#[derive(Clone, Default)]
pub struct TestExecutor {
    queue: Arc<Mutex<VecDeque<Box<dyn FnOnce() + Send + 'static>>>>,
}

impl TestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Runs the oldest queued task; returns false when the queue is empty.
    pub fn run_one(&self) -> bool {
        let task = self.queue.lock().unwrap().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs queued tasks until the queue stays empty, including tasks queued
    /// by the tasks themselves. Returns how many ran.
    pub fn flush(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Executor for TestExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.queue.lock().unwrap().push_back(task);
    }
}

/// Alternates between the fetch and notify queues until both are empty, the
/// way results bounce between the two contexts in production.
pub fn drain(notify: &TestExecutor, fetch: &TestExecutor) -> usize {
    let mut ran = 0;
    loop {
        let progressed = fetch.run_one() || notify.run_one();
        if !progressed {
            return ran;
        }
        ran += 1;
    }
}
