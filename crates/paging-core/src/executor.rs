//! Execution contexts supplied by the embedding application.
//!
//! The engine never spawns threads of its own. It is handed two executors at
//! construction time: a single-threaded "notify" context that owns all storage
//! mutation and observer dispatch, and a "fetch" context that data-source
//! loads are marshaled through. `paging-runtime-std` provides std-backed
//! implementations.

/// A sink for units of work, in the spirit of `java.util.concurrent.Executor`.
///
/// Implementations decide where and when the task runs: inline, on a queue
/// drained by a UI loop, or on a worker pool. Tasks must be `Send` because the
/// fetch and notify contexts generally live on different threads.
pub trait Executor: Send + Sync {
    /// Submits `task` for execution.
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>);
}
