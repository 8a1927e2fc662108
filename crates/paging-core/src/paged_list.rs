//! The presented list: a lazily loaded window over a data source.
//!
//! A [`PagedList`] holds the loaded pages (through `PagedStorage`), drives its
//! pager from `load_around` access hints, trims edge pages under a configured
//! memory bound, and keeps registered observers in sync through positional
//! change callbacks. A [`PagedList::snapshot`] is an immutable list sharing
//! the same pages; the delta between a snapshot and its live ancestor can be
//! replayed onto a fresh observer with `dispatch_updates_since_snapshot`.
//!
//! All observer and listener dispatch happens on the notify executor, which is
//! assumed single-threaded. Locks are never held across user callbacks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rustc_hash::FxHashMap;

use crate::adjacent::AdjacentProvider;
use crate::config::{Config, MAX_SIZE_UNBOUNDED};
use crate::executor::Executor;
use crate::future::LoadFuture;
use crate::load_state::{LoadState, LoadType};
use crate::pager::{PageConsumer, PageOutcome, Pager};
use crate::source::{DataSource, KeyStyle, LoadKey, LoadParams, PageResult};
use crate::storage::{PageEvent, PageEvents, PagedStorage};

/// Positional change observer, in `ListUpdateCallback` form: the minimal
/// surface a diffing list adapter needs.
pub trait ListUpdateCallback: Send {
    fn on_inserted(&mut self, position: usize, count: usize);
    fn on_removed(&mut self, position: usize, count: usize);
    fn on_changed(&mut self, position: usize, count: usize);
}

/// Signals when the window reaches the edges of the underlying data set, so
/// the application can page more data into its backing store.
pub trait BoundaryCallback<V>: Send {
    /// The initial load returned nothing.
    fn on_zero_items_loaded(&mut self) {}
    /// The first item of the data set has been loaded.
    fn on_item_at_front_loaded(&mut self, _item: &V) {}
    /// The last item of the data set has been loaded.
    fn on_item_at_end_loaded(&mut self, _item: &V) {}
}

/// Handle for a registered [`ListUpdateCallback`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CallbackId(u64);

/// Handle for a registered load-state listener.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

/// Rejection reasons for snapshot-relative observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot holds no pages, so no delta can be derived from it.
    EmptySnapshot,
    /// The snapshot does not describe an earlier state of this list; pages
    /// were trimmed or the lists are unrelated.
    NotAncestor,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::EmptySnapshot => write!(f, "snapshot is empty"),
            SnapshotError::NotAncestor => {
                write!(f, "snapshot is not an earlier state of this list")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Registry of keyed entries that tolerates removal from inside dispatch.
struct Registry<T> {
    entries: FxHashMap<u64, T>,
    /// Ids taken out of `entries` while their callback runs.
    in_flight: Vec<u64>,
    pending_removal: Vec<u64>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            in_flight: Vec::new(),
            pending_removal: Vec::new(),
        }
    }
}

/// Access bookkeeping: the latest accessed position and outstanding prefetch
/// debts, all in offset-adjusted coordinates so trims and prepends do not
/// shift them.
struct AccessState {
    last_load: isize,
    prepend_items_requested: isize,
    append_items_requested: isize,
}

struct BoundaryState<V> {
    callback: Option<Box<dyn BoundaryCallback<V>>>,
    empty_deferred: bool,
    begin_deferred: bool,
    end_deferred: bool,
    dispatch_posted: bool,
}

struct ListInner<K, V> {
    config: Config,
    source: Arc<dyn DataSource<K, V>>,
    notify_executor: Arc<dyn Executor>,
    storage: Arc<Mutex<PagedStorage<V>>>,
    /// `None` for snapshots, which never load.
    pager: Option<Arc<Pager<K, V>>>,
    weak_self: Weak<ListInner<K, V>>,
    required_remainder: usize,
    should_trim: bool,
    /// Whether trims keep the list size stable by swapping dropped pages for
    /// placeholders; set when the initial load positioned the window.
    replace_pages_with_nulls: bool,
    access: Mutex<AccessState>,
    observers: Mutex<Registry<Box<dyn ListUpdateCallback>>>,
    listeners: Mutex<Registry<Box<dyn FnMut(LoadType, &LoadState) + Send>>>,
    boundary: Mutex<BoundaryState<V>>,
    next_id: AtomicU64,
}

/// A lazily loaded, observable list window. Cheap to clone; clones share the
/// same underlying window.
pub struct PagedList<K, V> {
    inner: Arc<ListInner<K, V>>,
}

impl<K, V> Clone for PagedList<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> PagedList<K, V>
where
    K: Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds a list around an already-loaded initial page.
    pub fn new(
        config: Config,
        source: Arc<dyn DataSource<K, V>>,
        notify_executor: Arc<dyn Executor>,
        fetch_executor: Arc<dyn Executor>,
        initial_result: PageResult<K, V>,
    ) -> Self {
        let storage = Arc::new(Mutex::new(PagedStorage::new()));
        {
            let mut events = PageEvents::new();
            let mut locked = storage.lock().unwrap();
            if config.enable_placeholders {
                locked.init(
                    initial_result.leading_nulls(),
                    Arc::clone(initial_result.data()),
                    initial_result.trailing_nulls(),
                    initial_result.offset() as isize,
                    &mut events,
                );
            } else {
                // without placeholders the null regions collapse into the
                // position offset
                locked.init(
                    0,
                    Arc::clone(initial_result.data()),
                    0,
                    (initial_result.offset() + initial_result.leading_nulls()) as isize,
                    &mut events,
                );
            }
        }

        let (leading, trailing, storage_count, offset) = {
            let locked = storage.lock().unwrap();
            (
                locked.leading_null_count(),
                locked.trailing_null_count(),
                locked.storage_count(),
                locked.position_offset(),
            )
        };

        let required_remainder = config.required_remainder();
        let should_trim =
            source.supports_page_dropping() && config.max_size != MAX_SIZE_UNBOUNDED;
        let replace_pages_with_nulls = leading > 0 || trailing > 0;

        let inner = Arc::new_cyclic(|weak: &Weak<ListInner<K, V>>| {
            let adjacent: Arc<Mutex<dyn AdjacentProvider<V> + Send>> = storage.clone();
            let consumer: Weak<dyn PageConsumer<V>> = weak.clone();
            let pager = Arc::new(Pager::new(
                config.clone(),
                Arc::clone(&source),
                Arc::clone(&notify_executor),
                fetch_executor,
                consumer,
                adjacent,
                &initial_result,
            ));
            ListInner {
                config,
                source,
                notify_executor,
                storage: Arc::clone(&storage),
                pager: Some(pager),
                weak_self: weak.clone(),
                required_remainder,
                should_trim,
                replace_pages_with_nulls,
                access: Mutex::new(AccessState {
                    last_load: (leading + storage_count / 2) as isize + offset,
                    prepend_items_requested: 0,
                    append_items_requested: 0,
                }),
                observers: Mutex::new(Registry::new()),
                listeners: Mutex::new(Registry::new()),
                boundary: Mutex::new(BoundaryState {
                    callback: None,
                    empty_deferred: false,
                    begin_deferred: false,
                    end_deferred: false,
                    dispatch_posted: false,
                }),
                next_id: AtomicU64::new(1),
            }
        });

        PagedList { inner }
    }

    /// Issues the initial load and resolves to a wired-up list, or to the
    /// load error. The listener context is the notify executor, so the list
    /// is born on the thread that will own it.
    pub fn load_initial(
        config: Config,
        source: Arc<dyn DataSource<K, V>>,
        notify_executor: Arc<dyn Executor>,
        fetch_executor: Arc<dyn Executor>,
        initial_key: Option<LoadKey<K>>,
    ) -> LoadFuture<PagedList<K, V>> {
        let params = LoadParams {
            load_type: LoadType::Refresh,
            key: initial_key,
            load_size: config.initial_load_size_hint,
            placeholders_enabled: config.enable_placeholders,
            page_size: config.page_size,
        };
        let (future, completer) = LoadFuture::pending();
        let load = source.load(params);
        load.add_listener(Arc::clone(&notify_executor), {
            let source = Arc::clone(&source);
            move |result| match result {
                Ok(initial) => {
                    let list = PagedList::new(
                        config,
                        source,
                        notify_executor,
                        fetch_executor,
                        initial,
                    );
                    let empty = list.size() == 0;
                    list.inner.trigger_boundary(LoadType::Refresh, empty);
                    completer.set(list);
                }
                Err(error) => completer.set_error(error),
            }
        });
        future
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Total presented size, placeholders included.
    pub fn size(&self) -> usize {
        self.inner.storage.lock().unwrap().size()
    }

    /// Number of actually loaded items.
    pub fn loaded_count(&self) -> usize {
        self.inner.storage.lock().unwrap().loaded_count()
    }

    /// Item at `index`, or `None` for a placeholder position. Panics when
    /// `index` is outside `[0, size)`.
    pub fn get(&self, index: usize) -> Option<V> {
        self.inner.storage.lock().unwrap().get(index).cloned()
    }

    /// Records an access at `index` and schedules whatever edge loads are
    /// needed to keep `prefetch_distance` items loaded around it.
    pub fn load_around(&self, index: usize) {
        let (want_prepend, want_append) = {
            let mut access = self.inner.access.lock().unwrap();
            let storage = self.inner.storage.lock().unwrap();
            assert!(
                index < storage.size(),
                "index {index} out of bounds for size {}",
                storage.size()
            );
            access.last_load = index as isize + storage.position_offset();

            let prefetch = self.inner.config.prefetch_distance as isize;
            let leading = storage.leading_null_count() as isize;
            let loaded_end = (storage.leading_null_count() + storage.storage_count()) as isize;
            let prepend = prefetch - (index as isize - leading);
            let append = index as isize + prefetch + 1 - loaded_end;
            access.prepend_items_requested = access.prepend_items_requested.max(prepend);
            access.append_items_requested = access.append_items_requested.max(append);
            (
                access.prepend_items_requested > 0,
                access.append_items_requested > 0,
            )
        };
        if let Some(pager) = &self.inner.pager {
            if want_prepend {
                pager.try_schedule_prepend();
            }
            if want_append {
                pager.try_schedule_append();
            }
        }
    }

    /// An immutable list sharing this list's loaded pages.
    pub fn snapshot(&self) -> PagedList<K, V> {
        let storage_snapshot = self.inner.storage.lock().unwrap().snapshot();
        let last_load = self.inner.access.lock().unwrap().last_load;
        let inner = Arc::new_cyclic(|weak: &Weak<ListInner<K, V>>| ListInner {
            config: self.inner.config.clone(),
            source: Arc::clone(&self.inner.source),
            notify_executor: Arc::clone(&self.inner.notify_executor),
            storage: Arc::new(Mutex::new(storage_snapshot)),
            pager: None,
            weak_self: weak.clone(),
            required_remainder: self.inner.required_remainder,
            should_trim: false,
            replace_pages_with_nulls: self.inner.replace_pages_with_nulls,
            access: Mutex::new(AccessState {
                last_load,
                prepend_items_requested: 0,
                append_items_requested: 0,
            }),
            observers: Mutex::new(Registry::new()),
            listeners: Mutex::new(Registry::new()),
            boundary: Mutex::new(BoundaryState {
                callback: None,
                empty_deferred: false,
                begin_deferred: false,
                end_deferred: false,
                dispatch_posted: false,
            }),
            next_id: AtomicU64::new(1),
        });
        PagedList { inner }
    }

    /// True for snapshots and for lists whose pager has been stopped.
    pub fn is_detached(&self) -> bool {
        match &self.inner.pager {
            Some(pager) => pager.is_detached(),
            None => true,
        }
    }

    /// A detached list never changes again.
    pub fn is_immutable(&self) -> bool {
        self.is_detached()
    }

    /// Stops loading permanently; already loaded content stays presentable.
    pub fn detach(&self) {
        if let Some(pager) = &self.inner.pager {
            pager.detach();
        }
    }

    /// Re-drives edges that failed with a retryable error. No-op otherwise.
    pub fn retry(&self) {
        if let Some(pager) = &self.inner.pager {
            pager.retry();
        }
    }

    /// Key to rebuild a window centered near the last accessed position.
    pub fn last_key(&self) -> Option<LoadKey<K>> {
        let last_load = self.inner.access.lock().unwrap().last_load;
        match self.inner.source.key_style() {
            KeyStyle::Positional => Some(LoadKey::Position(last_load)),
            KeyStyle::PageKeyed | KeyStyle::ItemKeyed => {
                let storage = self.inner.storage.lock().unwrap();
                let index = last_load - storage.position_offset();
                if index < 0 || index as usize >= storage.size() {
                    return None;
                }
                storage
                    .get(index as usize)
                    .and_then(|item| self.inner.source.key_for(item))
                    .map(LoadKey::Key)
            }
        }
    }

    pub fn load_state(&self, load_type: LoadType) -> LoadState {
        match &self.inner.pager {
            Some(pager) => pager.load_state(load_type),
            None => LoadState::Idle,
        }
    }

    /// Overrides an edge state, typically to surface a refresh failure that
    /// happened outside this list.
    pub fn set_initial_load_state(&self, load_type: LoadType, state: LoadState) {
        if let Some(pager) = &self.inner.pager {
            pager.set_state(load_type, state);
        }
    }

    /// Registers a change observer. The observer sees changes from the
    /// current state onward.
    pub fn add_callback(&self, callback: Box<dyn ListUpdateCallback>) -> CallbackId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .unwrap()
            .entries
            .insert(id, callback);
        CallbackId(id)
    }

    /// Registers a change observer positioned at `snapshot`: the delta from
    /// the snapshot to the current state is replayed into `callback` first,
    /// then the observer starts receiving live changes.
    pub fn add_callback_with_snapshot(
        &self,
        snapshot: &PagedList<K, V>,
        mut callback: Box<dyn ListUpdateCallback>,
    ) -> Result<CallbackId, SnapshotError> {
        self.dispatch_updates_since_snapshot(snapshot, callback.as_mut())?;
        Ok(self.add_callback(callback))
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut observers = self.inner.observers.lock().unwrap();
        if observers.entries.remove(&id.0).is_some() {
            return true;
        }
        if observers.in_flight.contains(&id.0) {
            observers.pending_removal.push(id.0);
            return true;
        }
        false
    }

    /// Replays the positional changes between `snapshot` and this list into
    /// `callback`, as if the callback had observed them live.
    pub fn dispatch_updates_since_snapshot(
        &self,
        snapshot: &PagedList<K, V>,
        callback: &mut dyn ListUpdateCallback,
    ) -> Result<(), SnapshotError> {
        struct Stats {
            leading: usize,
            trailing: usize,
            storage_count: usize,
            prepended: usize,
            appended: usize,
        }
        fn stats<V>(storage: &Mutex<PagedStorage<V>>) -> Stats {
            let locked = storage.lock().unwrap();
            Stats {
                leading: locked.leading_null_count(),
                trailing: locked.trailing_null_count(),
                storage_count: locked.storage_count(),
                prepended: locked.number_prepended(),
                appended: locked.number_appended(),
            }
        }

        let old = stats(&snapshot.inner.storage);
        let new = stats(&self.inner.storage);

        if old.storage_count == 0 {
            return Err(SnapshotError::EmptySnapshot);
        }
        let newly_appended = new
            .appended
            .checked_sub(old.appended)
            .ok_or(SnapshotError::NotAncestor)?;
        let newly_prepended = new
            .prepended
            .checked_sub(old.prepended)
            .ok_or(SnapshotError::NotAncestor)?;
        if new.trailing != old.trailing.saturating_sub(newly_appended)
            || new.leading != old.leading.saturating_sub(newly_prepended)
            || new.storage_count != old.storage_count + newly_appended + newly_prepended
        {
            return Err(SnapshotError::NotAncestor);
        }

        if newly_appended > 0 {
            let changed = old.trailing.min(newly_appended);
            let added = newly_appended - changed;
            let end_position = old.leading + old.storage_count;
            if changed > 0 {
                callback.on_changed(end_position, changed);
            }
            if added > 0 {
                callback.on_inserted(end_position + changed, added);
            }
        }
        if newly_prepended > 0 {
            let changed = old.leading.min(newly_prepended);
            let added = newly_prepended - changed;
            if changed > 0 {
                // the filled placeholders are the ones directly before the
                // previously loaded range
                callback.on_changed(old.leading - changed, changed);
            }
            if added > 0 {
                callback.on_inserted(0, added);
            }
        }
        Ok(())
    }

    /// Registers a load-state listener; the current state of every edge is
    /// dispatched into it immediately.
    pub fn add_load_state_listener(
        &self,
        mut listener: impl FnMut(LoadType, &LoadState) + Send + 'static,
    ) -> ListenerId {
        if let Some(pager) = &self.inner.pager {
            pager.dispatch_current_load_state(&mut listener);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .entries
            .insert(id, Box::new(listener));
        ListenerId(id)
    }

    pub fn remove_load_state_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        if listeners.entries.remove(&id.0).is_some() {
            return true;
        }
        if listeners.in_flight.contains(&id.0) {
            listeners.pending_removal.push(id.0);
            return true;
        }
        false
    }

    /// Attaches the boundary callback; edge signals detected so far are
    /// delivered asynchronously on the notify executor.
    pub fn set_boundary_callback(&self, callback: Box<dyn BoundaryCallback<V>>) {
        {
            let mut boundary = self.inner.boundary.lock().unwrap();
            boundary.callback = Some(callback);
        }
        let empty = self.size() == 0;
        self.inner.trigger_boundary(LoadType::Refresh, empty);
    }
}

impl<K, V> ListInner<K, V>
where
    K: Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Runs `f` over every registry entry without holding the lock. Entries
    /// may unregister themselves from inside the call, and a callback that
    /// re-enters the list mid-dispatch still reaches every other entry; only
    /// the entry whose callback triggered the nested dispatch misses it.
    fn dispatch_registry<T>(registry: &Mutex<Registry<T>>, mut f: impl FnMut(&mut T)) {
        let ids: Vec<u64> = registry.lock().unwrap().entries.keys().copied().collect();
        for id in ids {
            let mut entry = {
                let mut locked = registry.lock().unwrap();
                // removed by an earlier callback in this pass
                let Some(entry) = locked.entries.remove(&id) else {
                    continue;
                };
                locked.in_flight.push(id);
                entry
            };
            f(&mut entry);
            let mut locked = registry.lock().unwrap();
            locked.in_flight.retain(|&held| held != id);
            if let Some(position) = locked.pending_removal.iter().position(|&r| r == id) {
                locked.pending_removal.remove(position);
            } else {
                locked.entries.insert(id, entry);
            }
        }
    }

    fn dispatch_events(&self, events: PageEvents) {
        for event in events {
            match event {
                PageEvent::Initialized { .. } => {
                    // the initial page predates every observer
                }
                PageEvent::Prepended {
                    leading_nulls,
                    changed,
                    added,
                } => Self::dispatch_registry(&self.observers, |observer| {
                    if changed > 0 {
                        observer.on_changed(leading_nulls, changed);
                    }
                    if added > 0 {
                        observer.on_inserted(0, added);
                    }
                }),
                PageEvent::Appended {
                    end_position,
                    changed,
                    added,
                } => Self::dispatch_registry(&self.observers, |observer| {
                    if changed > 0 {
                        observer.on_changed(end_position, changed);
                    }
                    if added > 0 {
                        observer.on_inserted(end_position + changed, added);
                    }
                }),
                PageEvent::PagesRemoved { start, count } => {
                    Self::dispatch_registry(&self.observers, |observer| {
                        observer.on_removed(start, count);
                    })
                }
                PageEvent::PagesSwappedToPlaceholder { start, count } => {
                    Self::dispatch_registry(&self.observers, |observer| {
                        observer.on_changed(start, count);
                    })
                }
                PageEvent::PlaceholderInserted { .. } | PageEvent::PageInserted { .. } => {
                    panic!("tiled storage event on a contiguous window")
                }
            }
        }
    }

    /// Records a detected boundary and posts one dispatch onto the notify
    /// executor. `page_empty` marks an edge load that returned nothing.
    fn trigger_boundary(&self, load_type: LoadType, page_empty: bool) {
        let list_empty = self.storage.lock().unwrap().size() == 0;
        let empty = list_empty && load_type == LoadType::Refresh;
        let begin = !list_empty && load_type == LoadType::Start && page_empty;
        let end = !list_empty && load_type == LoadType::End && page_empty;
        if !empty && !begin && !end {
            return;
        }

        let post = {
            let mut boundary = self.boundary.lock().unwrap();
            if boundary.callback.is_none() {
                return;
            }
            boundary.empty_deferred |= empty;
            boundary.begin_deferred |= begin;
            boundary.end_deferred |= end;
            let post = !boundary.dispatch_posted;
            boundary.dispatch_posted = true;
            post
        };
        if post {
            let weak = self.weak_self.clone();
            self.notify_executor.execute(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.dispatch_boundary();
                }
            }));
        }
    }

    fn dispatch_boundary(&self) {
        let (mut callback, empty, begin, end) = {
            let mut boundary = self.boundary.lock().unwrap();
            boundary.dispatch_posted = false;
            let Some(callback) = boundary.callback.take() else {
                return;
            };
            let flags = (
                boundary.empty_deferred,
                boundary.begin_deferred,
                boundary.end_deferred,
            );
            boundary.empty_deferred = false;
            boundary.begin_deferred = false;
            boundary.end_deferred = false;
            (callback, flags.0, flags.1, flags.2)
        };

        if empty {
            callback.on_zero_items_loaded();
        }
        if begin {
            let item = self.storage.lock().unwrap().first_loaded_item();
            if let Some(item) = item {
                callback.on_item_at_front_loaded(&item);
            }
        }
        if end {
            let item = self.storage.lock().unwrap().last_loaded_item();
            if let Some(item) = item {
                callback.on_item_at_end_loaded(&item);
            }
        }

        let mut boundary = self.boundary.lock().unwrap();
        if boundary.callback.is_none() {
            boundary.callback = Some(callback);
        }
    }
}

impl<K, V> PageConsumer<V> for ListInner<K, V>
where
    K: Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_page_result(&self, load_type: LoadType, data: &Arc<Vec<V>>) -> PageOutcome {
        let Some(pager) = &self.pager else {
            // snapshots never receive load results
            return PageOutcome {
                applied: false,
                continue_loading: false,
            };
        };

        let mut events = PageEvents::new();
        let mut rearm = None;
        let outcome = {
            let mut access = self.access.lock().unwrap();
            let mut storage = self.storage.lock().unwrap();
            let trim_from_front = access.last_load > storage.middle_of_loaded_range();

            let outcome = match load_type {
                LoadType::End => {
                    let skip = self.should_trim
                        && !trim_from_front
                        && storage.should_pre_trim_new_page(
                            self.config.max_size,
                            self.required_remainder,
                            data.len(),
                        );
                    if skip {
                        // the page would be trimmed right back out
                        log::trace!("dropping appended page, access is near the front");
                        access.append_items_requested = 0;
                        PageOutcome {
                            applied: false,
                            continue_loading: false,
                        }
                    } else {
                        if !data.is_empty() {
                            storage.append_page(Arc::clone(data), &mut events);
                        }
                        access.append_items_requested =
                            (access.append_items_requested - data.len() as isize).max(0);
                        PageOutcome {
                            applied: true,
                            continue_loading: access.append_items_requested > 0
                                && !data.is_empty(),
                        }
                    }
                }
                LoadType::Start => {
                    let skip = self.should_trim
                        && trim_from_front
                        && storage.should_pre_trim_new_page(
                            self.config.max_size,
                            self.required_remainder,
                            data.len(),
                        );
                    if skip {
                        log::trace!("dropping prepended page, access is near the end");
                        access.prepend_items_requested = 0;
                        PageOutcome {
                            applied: false,
                            continue_loading: false,
                        }
                    } else {
                        if !data.is_empty() {
                            storage.prepend_page(Arc::clone(data), &mut events);
                        }
                        access.prepend_items_requested =
                            (access.prepend_items_requested - data.len() as isize).max(0);
                        PageOutcome {
                            applied: true,
                            continue_loading: access.prepend_items_requested > 0
                                && !data.is_empty(),
                        }
                    }
                }
                LoadType::Refresh => {
                    panic!("refresh results are consumed at list construction")
                }
            };

            // trim the side opposite the access point, unless it is busy
            if self.should_trim {
                if trim_from_front {
                    if pager.load_state(LoadType::Start) != LoadState::Loading
                        && storage.trim_from_front(
                            self.replace_pages_with_nulls,
                            self.config.max_size,
                            self.required_remainder,
                            &mut events,
                        )
                    {
                        rearm = Some(LoadType::Start);
                    }
                } else if pager.load_state(LoadType::End) != LoadState::Loading
                    && storage.trim_from_end(
                        self.replace_pages_with_nulls,
                        self.config.max_size,
                        self.required_remainder,
                        &mut events,
                    )
                {
                    rearm = Some(LoadType::End);
                }
            }

            outcome
        };

        self.dispatch_events(events);
        if let Some(edge) = rearm {
            // content on that side is gone, so the edge may load again
            pager.set_state(edge, LoadState::Idle);
        }
        self.trigger_boundary(load_type, data.is_empty());
        outcome
    }

    fn on_state_changed(&self, load_type: LoadType, state: &LoadState) {
        Self::dispatch_registry(&self.listeners, |listener| listener(load_type, state));
    }
}
