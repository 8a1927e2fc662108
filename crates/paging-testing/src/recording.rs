//! Recording observers: positional changes, boundary signals, load states.

use std::sync::{Arc, Mutex};

use paging_core::{BoundaryCallback, ListUpdateCallback, LoadState, LoadType};

/// One positional change delivered to a [`ListUpdateCallback`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ListChange {
    Inserted { position: usize, count: usize },
    Removed { position: usize, count: usize },
    Changed { position: usize, count: usize },
}

/// Change observer that records everything it sees. Clones share the record,
/// so a test keeps one handle while the list owns the other.
#[derive(Clone, Default)]
pub struct RecordingCallback {
    events: Arc<Mutex<Vec<ListChange>>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the recorded changes.
    pub fn take(&self) -> Vec<ListChange> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl ListUpdateCallback for RecordingCallback {
    fn on_inserted(&mut self, position: usize, count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ListChange::Inserted { position, count });
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ListChange::Removed { position, count });
    }

    fn on_changed(&mut self, position: usize, count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ListChange::Changed { position, count });
    }
}

/// One boundary signal delivered to a [`BoundaryCallback`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BoundaryEvent<V> {
    ZeroItems,
    Front(V),
    End(V),
}

/// Boundary callback that records the signals it receives.
pub struct RecordingBoundary<V> {
    events: Arc<Mutex<Vec<BoundaryEvent<V>>>>,
}

impl<V> Default for RecordingBoundary<V> {
    fn default() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<V> Clone for RecordingBoundary<V> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<V> RecordingBoundary<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<BoundaryEvent<V>> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl<V: Clone + Send> BoundaryCallback<V> for RecordingBoundary<V> {
    fn on_zero_items_loaded(&mut self) {
        self.events.lock().unwrap().push(BoundaryEvent::ZeroItems);
    }

    fn on_item_at_front_loaded(&mut self, item: &V) {
        self.events
            .lock()
            .unwrap()
            .push(BoundaryEvent::Front(item.clone()));
    }

    fn on_item_at_end_loaded(&mut self, item: &V) {
        self.events
            .lock()
            .unwrap()
            .push(BoundaryEvent::End(item.clone()));
    }
}

/// Shared recorder for load-state transitions.
#[derive(Clone, Default)]
pub struct StateRecorder {
    events: Arc<Mutex<Vec<(LoadType, LoadState)>>>,
}

impl StateRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener closure feeding this recorder.
    pub fn listener(&self) -> impl FnMut(LoadType, &LoadState) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |load_type, state| {
            events.lock().unwrap().push((load_type, state.clone()));
        }
    }

    pub fn take(&self) -> Vec<(LoadType, LoadState)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Latest recorded state for `load_type`.
    pub fn last_for(&self, load_type: LoadType) -> Option<LoadState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| *t == load_type)
            .map(|(_, s)| s.clone())
    }
}
