//! Standard executors backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the [`Executor`]
//! abstraction defined in `paging-core`. Applications typically pair a
//! [`SingleThreadExecutor`] as the notify context with a
//! [`ThreadPoolExecutor`] as the fetch context; [`DirectExecutor`] runs tasks
//! inline and suits tests or embedders with their own event loop.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use paging_core::Executor;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs every task inline on the calling thread.
#[derive(Default)]
pub struct DirectExecutor;

impl DirectExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// A dedicated worker thread draining a task queue in submission order.
///
/// Dropping the executor closes the queue; already submitted tasks still run
/// before the worker exits.
pub struct SingleThreadExecutor {
    sender: Option<Sender<Task>>,
    worker: Option<JoinHandle<()>>,
}

impl SingleThreadExecutor {
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Task>();
        let worker = std::thread::Builder::new().name(name).spawn(move || {
            while let Ok(task) = receiver.recv() {
                task();
            }
        })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl Executor for SingleThreadExecutor {
    fn execute(&self, task: Task) {
        if let Some(sender) = &self.sender {
            if sender.send(task).is_err() {
                log::warn!("task submitted to a stopped executor");
            }
        }
    }
}

impl Drop for SingleThreadExecutor {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("executor worker panicked");
            }
        }
    }
}

/// Fixed pool of worker threads sharing one task queue.
pub struct ThreadPoolExecutor {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPoolExecutor {
    pub fn new(name: impl Into<String>, threads: usize) -> std::io::Result<Self> {
        assert!(threads > 0, "pool needs at least one thread");
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = Arc::clone(&receiver);
            let worker = std::thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || loop {
                    let task = receiver.lock().unwrap().recv();
                    match task {
                        Ok(task) => task(),
                        Err(_) => break,
                    }
                })?;
            workers.push(worker);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) {
        if let Some(sender) = &self.sender {
            if sender.send(task).is_err() {
                log::warn!("task submitted to a stopped executor");
            }
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("executor worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;

    #[test]
    fn direct_executor_runs_inline() {
        let executor = DirectExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        executor.execute(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_thread_executor_preserves_order() {
        let executor = SingleThreadExecutor::new("test-notify").unwrap();
        let (sender, receiver) = channel();
        for i in 0..10 {
            let sender = sender.clone();
            executor.execute(Box::new(move || {
                sender.send(i).unwrap();
            }));
        }
        let seen: Vec<i32> = receiver.iter().take(10).collect();
        assert_eq!(seen, (0..10).collect::<Vec<i32>>());
    }

    #[test]
    fn pool_runs_all_tasks() {
        let executor = ThreadPoolExecutor::new("test-fetch", 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = channel();
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            let sender = sender.clone();
            executor.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                sender.send(()).unwrap();
            }));
        }
        for _ in 0..100 {
            receiver.recv().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn drop_waits_for_submitted_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let executor = SingleThreadExecutor::new("test-drop").unwrap();
            for _ in 0..50 {
                let counter = Arc::clone(&counter);
                executor.execute(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
