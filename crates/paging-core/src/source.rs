//! Contract between the engine and the external data source.
//!
//! The source performs the actual I/O (database query, network call) and
//! returns one page per load call. The engine only cares about the key style
//! the source speaks — positional index, page token, or item-derived key —
//! and about the page metadata needed for placeholder accounting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::adjacent::PageResolution;
use crate::future::{LoadError, LoadFuture};
use crate::load_state::LoadType;

/// How a source addresses its pages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyStyle {
    /// Pages addressed by item position; the next key is the adjacent index.
    Positional,
    /// Pages carry explicit previous/next tokens.
    PageKeyed,
    /// Keys are derived from the boundary item via [`DataSource::key_for`].
    ItemKeyed,
}

/// A load key, tagged by how it was derived.
///
/// `Position` is produced for positional sources (adjacent index plus or
/// minus one); `Key` carries the source-defined token for page-keyed and
/// item-keyed sources.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LoadKey<K> {
    Position(isize),
    Key(K),
}

/// Parameters of one load call.
#[derive(Clone, Debug)]
pub struct LoadParams<K> {
    pub load_type: LoadType,
    /// `None` only for an initial load with no known position.
    pub key: Option<LoadKey<K>>,
    /// Requested size of the initial load.
    pub load_size: usize,
    pub placeholders_enabled: bool,
    /// Requested size of subsequent start/end loads.
    pub page_size: usize,
}

/// One page of loaded data plus the positioning metadata the window needs.
#[derive(Clone, Debug)]
pub struct PageResult<K, V> {
    data: Arc<Vec<V>>,
    prev_key: Option<K>,
    next_key: Option<K>,
    leading_nulls: usize,
    trailing_nulls: usize,
    offset: usize,
    counted: bool,
}

impl<K, V> PageResult<K, V> {
    /// A result with no position information (total count unknown).
    pub fn new(data: Vec<V>, prev_key: Option<K>, next_key: Option<K>) -> Self {
        Self {
            data: Arc::new(data),
            prev_key,
            next_key,
            leading_nulls: 0,
            trailing_nulls: 0,
            offset: 0,
            counted: false,
        }
    }

    /// A counted result: the source knows how many items precede and follow
    /// this page in the full data set.
    ///
    /// Panics if `data` is empty while null counts claim items exist — such a
    /// result is malformed and indicates a source bug.
    pub fn counted(
        data: Vec<V>,
        prev_key: Option<K>,
        next_key: Option<K>,
        leading_nulls: usize,
        trailing_nulls: usize,
    ) -> Self {
        assert!(
            !data.is_empty() || (leading_nulls == 0 && trailing_nulls == 0),
            "counted result cannot be empty while items are present in the data set"
        );
        Self {
            data: Arc::new(data),
            prev_key,
            next_key,
            leading_nulls,
            trailing_nulls,
            offset: 0,
            counted: true,
        }
    }

    /// An empty, uncounted result; used to synthesize exhausted edges.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, None)
    }

    /// Position of the first item when placeholders are disabled but the
    /// source still knows where the page sits.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn data(&self) -> &Arc<Vec<V>> {
        &self.data
    }

    pub fn prev_key(&self) -> Option<&K> {
        self.prev_key.as_ref()
    }

    pub fn next_key(&self) -> Option<&K> {
        self.next_key.as_ref()
    }

    pub fn leading_nulls(&self) -> usize {
        self.leading_nulls
    }

    pub fn trailing_nulls(&self) -> usize {
        self.trailing_nulls
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_counted(&self) -> bool {
        self.counted
    }

    /// Total size of the data set, when the source reported it.
    pub fn total_count(&self) -> Option<usize> {
        self.counted
            .then(|| self.leading_nulls + self.data.len() + self.trailing_nulls)
    }

    /// Counted positional initial loads must be page-aligned, or fixed-width
    /// indexing would address the wrong items. Panics when misaligned.
    pub fn validate_for_initial_tiling(&self, page_size: usize) {
        if !self.counted {
            return;
        }
        assert!(
            self.leading_nulls % page_size == 0 && self.offset % page_size == 0,
            "counted positional initial load must be page-size aligned \
             (position {}, page size {})",
            self.leading_nulls + self.offset,
            page_size,
        );
    }

    pub(crate) fn resolution(&self, load_type: LoadType) -> PageResolution<'_, V> {
        PageResolution {
            load_type,
            data: &self.data,
            leading_nulls: self.leading_nulls,
            offset: self.offset,
        }
    }
}

/// The external collaborator that produces pages.
///
/// Implementations must be safe to call from the notify context and to probe
/// (`is_invalid`) from the fetch context.
pub trait DataSource<K, V>: Send + Sync {
    fn key_style(&self) -> KeyStyle;

    /// Issues one asynchronous load. The returned future may already be
    /// resolved for in-memory sources.
    fn load(&self, params: LoadParams<K>) -> LoadFuture<PageResult<K, V>>;

    /// Derives the key adjacent to `item`; required for item-keyed sources.
    fn key_for(&self, _item: &V) -> Option<K> {
        None
    }

    /// Once true, results from in-flight loads are dropped and the window
    /// must be replaced.
    fn is_invalid(&self) -> bool;

    /// Classifies a load failure; retryable errors can be re-driven through
    /// an explicit retry call.
    fn is_retryable_error(&self, _error: &LoadError) -> bool {
        false
    }

    /// Whether pages handed to the window may be dropped again under memory
    /// pressure. Page-keyed sources typically cannot support this, since a
    /// dropped page takes its adjacency tokens with it.
    fn supports_page_dropping(&self) -> bool {
        true
    }
}

/// Invalidation flag plus callback registry for sources to embed, so
/// `invalidate`/`is_invalid` behave uniformly across implementations.
#[derive(Default)]
pub struct SourceInvalidation {
    invalid: AtomicBool,
    callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl SourceInvalidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::SeqCst)
    }

    /// Marks the source invalid; callbacks fire exactly once, on the first
    /// call.
    pub fn invalidate(&self) {
        if self.invalid.swap(true, Ordering::SeqCst) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.callbacks.lock().unwrap());
        for callback in callbacks {
            callback();
        }
    }

    /// Registers a callback to run on invalidation; runs immediately if the
    /// source is already invalid.
    pub fn on_invalidated(&self, callback: impl FnOnce() + Send + 'static) {
        if self.is_invalid() {
            callback();
            return;
        }
        let mut callbacks = self.callbacks.lock().unwrap();
        // flag may have flipped while acquiring the lock
        if self.is_invalid() {
            drop(callbacks);
            callback();
        } else {
            callbacks.push(Box::new(callback));
        }
    }
}
