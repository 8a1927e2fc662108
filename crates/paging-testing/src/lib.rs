//! Deterministic test doubles for the paging engine: queue-backed executors,
//! in-memory data sources with failure injection, and recording observers.

mod executor;
mod recording;
mod sources;

pub use executor::{drain, TestExecutor};
pub use recording::{BoundaryEvent, ListChange, RecordingBoundary, RecordingCallback, StateRecorder};
pub use sources::{KeyedListDataSource, ListDataSource, TestLoadError};
