//! Core engine for incrementally loading list data from a paged source.
//!
//! A [`PagedList`] presents a fixed-size logical list whose content is loaded
//! lazily, page by page, from a [`DataSource`]. Accessing positions through
//! [`PagedList::load_around`] schedules asynchronous loads toward the nearest
//! edge, with per-edge [`LoadState`]s observable through listeners. Under a
//! configured [`Config::max_size`], pages far from the access point are
//! dropped again, keeping memory bounded while scrolling through arbitrarily
//! large data sets.
//!
//! The engine owns no threads. Embedders supply two [`Executor`]s: a
//! single-threaded notify context that owns storage mutation and observer
//! dispatch, and a fetch context that source loads are checked on. The
//! `paging-runtime-std` crate provides std-backed executors.

mod adjacent;
mod config;
mod executor;
mod future;
mod load_state;
mod paged_list;
mod pager;
mod source;
mod storage;

pub use adjacent::{AdjacentProvider, PageResolution, SimpleAdjacentProvider};
pub use config::{Config, ConfigBuilder, MAX_SIZE_UNBOUNDED};
pub use executor::Executor;
pub use future::{LoadError, LoadFuture, LoadFutureCompleter};
pub use load_state::{LoadState, LoadType};
pub use paged_list::{
    BoundaryCallback, CallbackId, ListUpdateCallback, ListenerId, PagedList, SnapshotError,
};
pub use source::{
    DataSource, KeyStyle, LoadKey, LoadParams, PageResult, SourceInvalidation,
};
