//! A minimal listenable future for asynchronous load results.
//!
//! Data sources hand back a [`LoadFuture`] from `load()`; the pager attaches a
//! listener that runs on an executor of its choosing. This is deliberately
//! small: one value, one error channel, listeners dispatched on completion or
//! immediately if the future already resolved.

use std::sync::{Arc, Mutex};

use crate::executor::Executor;

/// Error value carried by failed loads and attached to error load states.
pub type LoadError = Arc<dyn std::error::Error + Send + Sync + 'static>;

type Listener<T> = (
    Arc<dyn Executor>,
    Box<dyn FnOnce(Result<T, LoadError>) + Send + 'static>,
);

struct FutureInner<T> {
    result: Option<Result<T, LoadError>>,
    listeners: Vec<Listener<T>>,
}

/// A future-like handle whose completion is observed through listeners rather
/// than polling.
pub struct LoadFuture<T> {
    inner: Arc<Mutex<FutureInner<T>>>,
}

impl<T> Clone for LoadFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Write half of a [`LoadFuture`]; completing it fires all listeners.
pub struct LoadFutureCompleter<T> {
    inner: Arc<Mutex<FutureInner<T>>>,
}

impl<T: Clone + Send + 'static> LoadFuture<T> {
    /// Creates an unresolved future and the completer that resolves it.
    pub fn pending() -> (Self, LoadFutureCompleter<T>) {
        let inner = Arc::new(Mutex::new(FutureInner {
            result: None,
            listeners: Vec::new(),
        }));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            LoadFutureCompleter { inner },
        )
    }

    /// A future that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FutureInner {
                result: Some(Ok(value)),
                listeners: Vec::new(),
            })),
        }
    }

    /// A future that has already failed with `error`.
    pub fn failed(error: LoadError) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FutureInner {
                result: Some(Err(error)),
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers a listener to run on `executor` once the future resolves.
    ///
    /// If the future is already complete the listener is submitted right away.
    pub fn add_listener(
        &self,
        executor: Arc<dyn Executor>,
        listener: impl FnOnce(Result<T, LoadError>) + Send + 'static,
    ) {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.result {
                Some(result) => result.clone(),
                None => {
                    inner.listeners.push((executor, Box::new(listener)));
                    return;
                }
            }
        };
        executor.execute(Box::new(move || listener(result)));
    }

    /// Returns a copy of the result if the future has resolved.
    pub fn peek(&self) -> Option<Result<T, LoadError>> {
        self.inner.lock().unwrap().result.clone()
    }
}

impl<T: Clone + Send + 'static> LoadFutureCompleter<T> {
    /// Resolves the future successfully.
    pub fn set(self, value: T) {
        self.complete(Ok(value));
    }

    /// Fails the future.
    pub fn set_error(self, error: LoadError) {
        self.complete(Err(error));
    }

    fn complete(self, result: Result<T, LoadError>) {
        let listeners = {
            let mut inner = self.inner.lock().unwrap();
            assert!(inner.result.is_none(), "load future completed twice");
            inner.result = Some(result.clone());
            std::mem::take(&mut inner.listeners)
        };
        for (executor, listener) in listeners {
            let result = result.clone();
            executor.execute(Box::new(move || listener(result)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Inline;

    impl Executor for Inline {
        fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
            task();
        }
    }

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn listener_added_before_completion_fires_on_set() {
        let (future, completer) = LoadFuture::<u32>::pending();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        future.add_listener(Arc::new(Inline), move |result| {
            assert_eq!(result.unwrap(), 7);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        completer.set(7);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_added_after_completion_fires_immediately() {
        let future = LoadFuture::ready(3_u32);
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        future.add_listener(Arc::new(Inline), move |result| {
            assert_eq!(result.unwrap(), 3);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_delivered_to_listener() {
        let future = LoadFuture::<u32>::failed(Arc::new(Boom));
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        future.add_listener(Arc::new(Inline), move |result| {
            assert!(result.is_err());
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn peek_reports_resolution() {
        let (future, completer) = LoadFuture::<u32>::pending();
        assert!(future.peek().is_none());
        completer.set(1);
        assert_eq!(future.peek().unwrap().unwrap(), 1);
    }
}
