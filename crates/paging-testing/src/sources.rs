//! In-memory data sources with failure injection and manual completion.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use paging_core::{
    DataSource, KeyStyle, LoadError, LoadFuture, LoadFutureCompleter, LoadKey, LoadParams,
    LoadType, PageResult, SourceInvalidation,
};

/// Injected load failure, classified as retryable or permanent.
#[derive(Debug)]
pub struct TestLoadError {
    message: String,
    retryable: bool,
}

impl TestLoadError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for TestLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TestLoadError {}

fn classify(error: &LoadError) -> bool {
    error
        .downcast_ref::<TestLoadError>()
        .map(TestLoadError::is_retryable)
        .unwrap_or(false)
}

type Pending<V> = (LoadParams<usize>, LoadFutureCompleter<PageResult<usize, V>>);

/// Positional source over a fixed item list.
///
/// In immediate mode every load resolves synchronously; in manual mode loads
/// stay pending until [`ListDataSource::complete_next`] is called, which lets
/// tests interleave loads and accesses deterministically.
pub struct ListDataSource<V> {
    items: Vec<V>,
    immediate: bool,
    invalidation: SourceInvalidation,
    fail_next: Mutex<Option<TestLoadError>>,
    pending: Mutex<VecDeque<Pending<V>>>,
    recorded: Mutex<Vec<LoadParams<usize>>>,
}

impl<V: Clone + Send + Sync + 'static> ListDataSource<V> {
    pub fn new(items: Vec<V>) -> Self {
        Self {
            items,
            immediate: true,
            invalidation: SourceInvalidation::new(),
            fail_next: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// A source whose loads stay pending until completed explicitly.
    pub fn manual(items: Vec<V>) -> Self {
        Self {
            immediate: false,
            ..Self::new(items)
        }
    }

    /// Makes the next load fail with `error` instead of producing a page.
    pub fn fail_next(&self, error: TestLoadError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn invalidate(&self) {
        self.invalidation.invalidate();
    }

    /// Number of load calls issued so far.
    pub fn load_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn recorded_params(&self) -> Vec<LoadParams<usize>> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Resolves the oldest pending load; returns false if none is pending.
    pub fn complete_next(&self) -> bool {
        let Some((params, completer)) = self.pending.lock().unwrap().pop_front() else {
            return false;
        };
        match self.fail_next.lock().unwrap().take() {
            Some(error) => completer.set_error(Arc::new(error)),
            None => completer.set(self.page_for(&params)),
        }
        true
    }

    fn page_for(&self, params: &LoadParams<usize>) -> PageResult<usize, V> {
        let total = self.items.len() as isize;
        let (start, end) = match params.load_type {
            LoadType::Refresh => {
                let position = match &params.key {
                    Some(LoadKey::Position(p)) => *p,
                    _ => 0,
                };
                let start = position.clamp(0, total);
                (start, (start + params.load_size as isize).min(total))
            }
            LoadType::Start => {
                let position = match &params.key {
                    Some(LoadKey::Position(p)) => *p,
                    _ => panic!("positional source requires a position key"),
                };
                let end = (position + 1).clamp(0, total);
                ((end - params.page_size as isize).max(0), end)
            }
            LoadType::End => {
                let position = match &params.key {
                    Some(LoadKey::Position(p)) => *p,
                    _ => panic!("positional source requires a position key"),
                };
                let start = position.clamp(0, total);
                (start, (start + params.page_size as isize).min(total))
            }
        };
        let (start, end) = (start as usize, end as usize);
        let data: Vec<V> = self.items[start..end].to_vec();
        if data.is_empty() {
            return PageResult::empty();
        }
        if params.placeholders_enabled {
            PageResult::counted(data, None, None, start, self.items.len() - end)
        } else {
            PageResult::new(data, None, None).with_offset(start)
        }
    }
}

impl ListDataSource<i32> {
    /// A source over `0..total`.
    pub fn counting(total: usize) -> Self {
        Self::new((0..total as i32).collect())
    }

    /// Manual-mode source over `0..total`.
    pub fn counting_manual(total: usize) -> Self {
        Self::manual((0..total as i32).collect())
    }
}

impl<V: Clone + Send + Sync + 'static> DataSource<usize, V> for ListDataSource<V> {
    fn key_style(&self) -> KeyStyle {
        KeyStyle::Positional
    }

    fn load(&self, params: LoadParams<usize>) -> LoadFuture<PageResult<usize, V>> {
        self.recorded.lock().unwrap().push(params.clone());
        if self.immediate {
            match self.fail_next.lock().unwrap().take() {
                Some(error) => LoadFuture::failed(Arc::new(error)),
                None => LoadFuture::ready(self.page_for(&params)),
            }
        } else {
            let (future, completer) = LoadFuture::pending();
            self.pending.lock().unwrap().push_back((params, completer));
            future
        }
    }

    fn is_invalid(&self) -> bool {
        self.invalidation.is_invalid()
    }

    fn is_retryable_error(&self, error: &LoadError) -> bool {
        classify(error)
    }
}

/// Page-keyed source over pre-chunked pages; the key is the page number and
/// each result carries explicit previous/next tokens.
///
/// Loads resolve synchronously unless built with
/// [`KeyedListDataSource::manual`].
pub struct KeyedListDataSource<V> {
    pages: Vec<Vec<V>>,
    immediate: bool,
    droppable: bool,
    invalidation: SourceInvalidation,
    fail_next: Mutex<Option<TestLoadError>>,
    pending: Mutex<VecDeque<Pending<V>>>,
    recorded: Mutex<Vec<LoadParams<usize>>>,
}

impl<V: Clone + Send + Sync + 'static> KeyedListDataSource<V> {
    pub fn new(pages: Vec<Vec<V>>) -> Self {
        Self {
            pages,
            immediate: true,
            droppable: false,
            invalidation: SourceInvalidation::new(),
            fail_next: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// A source whose loads stay pending until completed explicitly.
    pub fn manual(pages: Vec<Vec<V>>) -> Self {
        Self {
            immediate: false,
            ..Self::new(pages)
        }
    }

    /// Opts in to page dropping; the tokens here are plain page numbers, so
    /// a dropped page can simply be requested again by index.
    pub fn allow_page_dropping(mut self) -> Self {
        self.droppable = true;
        self
    }

    pub fn fail_next(&self, error: TestLoadError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn invalidate(&self) {
        self.invalidation.invalidate();
    }

    pub fn load_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn recorded_params(&self) -> Vec<LoadParams<usize>> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Resolves the oldest pending load; returns false if none is pending.
    pub fn complete_next(&self) -> bool {
        let Some((params, completer)) = self.pending.lock().unwrap().pop_front() else {
            return false;
        };
        match self.fail_next.lock().unwrap().take() {
            Some(error) => completer.set_error(Arc::new(error)),
            None => completer.set(self.page_for(&params)),
        }
        true
    }

    fn page_for(&self, params: &LoadParams<usize>) -> PageResult<usize, V> {
        let index = match &params.key {
            Some(LoadKey::Key(k)) => *k,
            None => 0,
            Some(LoadKey::Position(_)) => panic!("page-keyed source requires a page key"),
        };
        if index >= self.pages.len() {
            return PageResult::empty();
        }
        let prev = index.checked_sub(1);
        let next = (index + 1 < self.pages.len()).then_some(index + 1);
        PageResult::new(self.pages[index].clone(), prev, next)
    }
}

impl<V: Clone + Send + Sync + 'static> DataSource<usize, V> for KeyedListDataSource<V> {
    fn key_style(&self) -> KeyStyle {
        KeyStyle::PageKeyed
    }

    fn load(&self, params: LoadParams<usize>) -> LoadFuture<PageResult<usize, V>> {
        self.recorded.lock().unwrap().push(params.clone());
        if self.immediate {
            match self.fail_next.lock().unwrap().take() {
                Some(error) => LoadFuture::failed(Arc::new(error)),
                None => LoadFuture::ready(self.page_for(&params)),
            }
        } else {
            let (future, completer) = LoadFuture::pending();
            self.pending.lock().unwrap().push_back((params, completer));
            future
        }
    }

    fn is_invalid(&self) -> bool {
        self.invalidation.is_invalid()
    }

    fn is_retryable_error(&self, error: &LoadError) -> bool {
        classify(error)
    }

    /// Off by default: dropping a page usually strands its neighbors, whose
    /// tokens point at the dropped page rather than past it.
    fn supports_page_dropping(&self) -> bool {
        self.droppable
    }
}
