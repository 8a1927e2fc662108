//! Prefetch orchestration: schedules edge loads, derives keys, and tracks
//! per-edge load states.
//!
//! The pager sits between a window and its data source. It never touches the
//! stored pages directly; results are handed to a [`PageConsumer`] (the
//! window), which decides whether to apply them and whether the load burst
//! should continue. Load results are first checked for source invalidation on
//! the fetch context, then marshaled to the notify context, so a consumer only
//! ever sees results on the single thread that owns its storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::adjacent::AdjacentProvider;
use crate::config::Config;
use crate::executor::Executor;
use crate::future::{LoadError, LoadFuture};
use crate::load_state::{LoadState, LoadStateManager, LoadType};
use crate::source::{DataSource, KeyStyle, LoadKey, LoadParams, PageResult};

/// The consumer's verdict on one delivered page.
pub(crate) struct PageOutcome {
    /// Whether the page was committed to storage. Dropped pages must not
    /// influence key derivation.
    pub(crate) applied: bool,
    /// Whether more data in the same direction is still wanted.
    pub(crate) continue_loading: bool,
}

/// Receiver of load results and state transitions, on the notify context.
pub(crate) trait PageConsumer<V>: Send + Sync {
    fn on_page_result(&self, load_type: LoadType, data: &Arc<Vec<V>>) -> PageOutcome;
    fn on_state_changed(&self, load_type: LoadType, state: &LoadState);
}

/// Page tokens carried over from the latest result at each edge.
#[derive(Debug)]
struct KeyTracker<K> {
    prev_key: Option<K>,
    next_key: Option<K>,
}

pub(crate) struct Pager<K, V> {
    config: Config,
    source: Arc<dyn DataSource<K, V>>,
    notify_executor: Arc<dyn Executor>,
    fetch_executor: Arc<dyn Executor>,
    consumer: Weak<dyn PageConsumer<V>>,
    adjacent: Arc<Mutex<dyn AdjacentProvider<V> + Send>>,
    /// Total size of the data set, when the initial load was counted.
    total_count: Option<usize>,
    keys: Mutex<KeyTracker<K>>,
    states: Mutex<LoadStateManager>,
    detached: AtomicBool,
}

impl<K, V> Pager<K, V>
where
    K: Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        config: Config,
        source: Arc<dyn DataSource<K, V>>,
        notify_executor: Arc<dyn Executor>,
        fetch_executor: Arc<dyn Executor>,
        consumer: Weak<dyn PageConsumer<V>>,
        adjacent: Arc<Mutex<dyn AdjacentProvider<V> + Send>>,
        initial_result: &PageResult<K, V>,
    ) -> Self {
        if source.key_style() == KeyStyle::Positional && config.enable_placeholders {
            initial_result.validate_for_initial_tiling(config.page_size);
        }
        let pager = Self {
            config,
            source,
            notify_executor,
            fetch_executor,
            consumer,
            adjacent,
            total_count: initial_result.total_count(),
            keys: Mutex::new(KeyTracker {
                prev_key: initial_result.prev_key().cloned(),
                next_key: initial_result.next_key().cloned(),
            }),
            states: Mutex::new(LoadStateManager::new()),
            detached: AtomicBool::new(false),
        };
        pager
            .adjacent
            .lock()
            .unwrap()
            .on_page_resolved(initial_result.resolution(LoadType::Refresh));
        pager
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Stops this pager permanently: in-flight results are dropped and no new
    /// loads are scheduled.
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub(crate) fn load_state(&self, load_type: LoadType) -> LoadState {
        self.states.lock().unwrap().get(load_type).clone()
    }

    pub(crate) fn dispatch_current_load_state(
        &self,
        listener: &mut dyn FnMut(LoadType, &LoadState),
    ) {
        self.states.lock().unwrap().dispatch_current(listener);
    }

    pub(crate) fn set_state(&self, load_type: LoadType, state: LoadState) {
        let changed = self.states.lock().unwrap().set_state(load_type, state.clone());
        // lock released before touching the consumer
        if changed {
            if let Some(consumer) = self.consumer.upgrade() {
                consumer.on_state_changed(load_type, &state);
            }
        }
    }

    fn can_prepend(&self) -> bool {
        match self.total_count {
            // uncounted; loading may continue until an empty page
            None => true,
            Some(_) => self.adjacent.lock().unwrap().first_loaded_index() > 0,
        }
    }

    fn can_append(&self) -> bool {
        match self.total_count {
            None => true,
            Some(count) => {
                self.adjacent.lock().unwrap().last_loaded_index() < count as isize - 1
            }
        }
    }

    /// Schedules a prepend if that edge is idle.
    pub(crate) fn try_schedule_prepend(self: &Arc<Self>) {
        if *self.states.lock().unwrap().get(LoadType::Start) == LoadState::Idle {
            self.schedule_prepend();
        }
    }

    /// Schedules an append if that edge is idle.
    pub(crate) fn try_schedule_append(self: &Arc<Self>) {
        if *self.states.lock().unwrap().get(LoadType::End) == LoadState::Idle {
            self.schedule_append();
        }
    }

    /// Re-drives any edge sitting in a retryable error state.
    pub(crate) fn retry(self: &Arc<Self>) {
        let (retry_start, retry_end) = {
            let states = self.states.lock().unwrap();
            (
                states.get(LoadType::Start).is_retryable_error(),
                states.get(LoadType::End).is_retryable_error(),
            )
        };
        if retry_start {
            log::debug!("retrying failed prepend");
            self.schedule_prepend();
        }
        if retry_end {
            log::debug!("retrying failed append");
            self.schedule_append();
        }
    }

    fn schedule_prepend(self: &Arc<Self>) {
        if self.is_detached() {
            return;
        }
        if !self.can_prepend() {
            // the edge is exhausted; resolve it without touching the source
            self.on_load_success(LoadType::Start, PageResult::empty());
            return;
        }

        let key = match self.source.key_style() {
            KeyStyle::Positional => Some(LoadKey::Position(
                self.adjacent.lock().unwrap().first_loaded_index() - 1,
            )),
            KeyStyle::PageKeyed => self
                .keys
                .lock()
                .unwrap()
                .prev_key
                .clone()
                .map(LoadKey::Key),
            KeyStyle::ItemKeyed => {
                let item = self.adjacent.lock().unwrap().first_loaded_item();
                item.and_then(|item| self.source.key_for(&item)).map(LoadKey::Key)
            }
        };
        let Some(key) = key else {
            self.on_load_success(LoadType::Start, PageResult::empty());
            return;
        };

        self.set_state(LoadType::Start, LoadState::Loading);
        let params = LoadParams {
            load_type: LoadType::Start,
            key: Some(key),
            load_size: self.config.initial_load_size_hint,
            placeholders_enabled: self.config.enable_placeholders,
            page_size: self.config.page_size,
        };
        self.listen_to(LoadType::Start, self.source.load(params));
    }

    fn schedule_append(self: &Arc<Self>) {
        if self.is_detached() {
            return;
        }
        if !self.can_append() {
            self.on_load_success(LoadType::End, PageResult::empty());
            return;
        }

        let key = match self.source.key_style() {
            KeyStyle::Positional => Some(LoadKey::Position(
                self.adjacent.lock().unwrap().last_loaded_index() + 1,
            )),
            KeyStyle::PageKeyed => self
                .keys
                .lock()
                .unwrap()
                .next_key
                .clone()
                .map(LoadKey::Key),
            KeyStyle::ItemKeyed => {
                let item = self.adjacent.lock().unwrap().last_loaded_item();
                item.and_then(|item| self.source.key_for(&item)).map(LoadKey::Key)
            }
        };
        let Some(key) = key else {
            self.on_load_success(LoadType::End, PageResult::empty());
            return;
        };

        self.set_state(LoadType::End, LoadState::Loading);
        let params = LoadParams {
            load_type: LoadType::End,
            key: Some(key),
            load_size: self.config.initial_load_size_hint,
            placeholders_enabled: self.config.enable_placeholders,
            page_size: self.config.page_size,
        };
        self.listen_to(LoadType::End, self.source.load(params));
    }

    /// Attaches the two-phase result path: invalidation is checked on the
    /// fetch context, then the result is marshaled to the notify context.
    fn listen_to(self: &Arc<Self>, load_type: LoadType, future: LoadFuture<PageResult<K, V>>) {
        let pager = Arc::clone(self);
        future.add_listener(Arc::clone(&self.fetch_executor), move |result| {
            if pager.source.is_invalid() {
                log::debug!("ignoring load result: data source is invalid");
                pager.detach();
                return;
            }
            let notify = Arc::clone(&pager.notify_executor);
            let on_notify = Arc::clone(&pager);
            notify.execute(Box::new(move || match result {
                Ok(page) => on_notify.on_load_success(load_type, page),
                Err(error) => on_notify.on_load_error(load_type, error),
            }));
        });
    }

    fn on_load_success(self: &Arc<Self>, load_type: LoadType, result: PageResult<K, V>) {
        if self.is_detached() {
            log::trace!("dropping load result: pager is detached");
            return;
        }
        let Some(consumer) = self.consumer.upgrade() else {
            self.detach();
            return;
        };

        if load_type == LoadType::Refresh {
            panic!("can only fetch more during append/prepend");
        }

        let outcome = consumer.on_page_result(load_type, result.data());
        if outcome.applied {
            {
                // keys advance with every committed page, including the one
                // that ends a burst; a page dropped before insertion keeps
                // the old token so the next load requests it again
                let mut keys = self.keys.lock().unwrap();
                match load_type {
                    LoadType::Start => keys.prev_key = result.prev_key().cloned(),
                    LoadType::End => keys.next_key = result.next_key().cloned(),
                    LoadType::Refresh => unreachable!(),
                }
            }
            self.adjacent
                .lock()
                .unwrap()
                .on_page_resolved(result.resolution(load_type));
        }
        if outcome.continue_loading {
            match load_type {
                LoadType::Start => self.schedule_prepend(),
                LoadType::End => self.schedule_append(),
                LoadType::Refresh => unreachable!(),
            }
        } else if result.data().is_empty() {
            self.set_state(load_type, LoadState::Done);
        } else {
            self.set_state(load_type, LoadState::Idle);
        }
    }

    fn on_load_error(self: &Arc<Self>, load_type: LoadType, error: LoadError) {
        if self.is_detached() {
            log::trace!("dropping load error: pager is detached");
            return;
        }
        let state = if self.source.is_retryable_error(&error) {
            LoadState::RetryableError(error)
        } else {
            LoadState::Error(error)
        };
        self.set_state(load_type, state);
    }
}
