//! Tracking of the first and last loaded item, used for key derivation.
//!
//! The pager needs to know which logical index (and which item) sits at each
//! edge of the loaded region to compute the next load key. The storage itself
//! implements [`AdjacentProvider`] for a wired-up window;
//! [`SimpleAdjacentProvider`] is a standalone O(1) tracker for uses where no
//! storage is attached.

use crate::load_state::LoadType;

/// A page result the window has committed, seen through the fields the
/// tracker needs.
pub struct PageResolution<'a, V> {
    pub load_type: LoadType,
    pub data: &'a [V],
    pub leading_nulls: usize,
    pub offset: usize,
}

/// Source of the first/last loaded item and its logical index.
///
/// Indices are logical positions and may go negative when the total count is
/// unknown and content is prepended past the initial position.
pub trait AdjacentProvider<V> {
    fn first_loaded_item(&self) -> Option<V>;
    fn last_loaded_item(&self) -> Option<V>;
    fn first_loaded_index(&self) -> isize;
    fn last_loaded_index(&self) -> isize;

    /// Notifies the tracker of a page the window committed. Pages dropped
    /// before insertion (pre-trim) are never reported here, so the tracker
    /// stays consistent with what is actually loaded.
    fn on_page_resolved(&mut self, resolution: PageResolution<'_, V>);
}

/// Standalone adjacent tracker, updated in O(1) per resolved page.
#[derive(Debug, Default)]
pub struct SimpleAdjacentProvider<V> {
    first_index: isize,
    last_index: isize,
    first_item: Option<V>,
    last_item: Option<V>,
}

impl<V> SimpleAdjacentProvider<V> {
    pub fn new() -> Self {
        Self {
            first_index: 0,
            last_index: 0,
            first_item: None,
            last_item: None,
        }
    }
}

impl<V: Clone> AdjacentProvider<V> for SimpleAdjacentProvider<V> {
    fn first_loaded_item(&self) -> Option<V> {
        self.first_item.clone()
    }

    fn last_loaded_item(&self) -> Option<V> {
        self.last_item.clone()
    }

    fn first_loaded_index(&self) -> isize {
        self.first_index
    }

    fn last_loaded_index(&self) -> isize {
        self.last_index
    }

    fn on_page_resolved(&mut self, resolution: PageResolution<'_, V>) {
        if resolution.data.is_empty() {
            return;
        }
        match resolution.load_type {
            LoadType::Start => {
                self.first_index -= resolution.data.len() as isize;
                self.first_item = resolution.data.first().cloned();
            }
            LoadType::End => {
                self.last_index += resolution.data.len() as isize;
                self.last_item = resolution.data.last().cloned();
            }
            LoadType::Refresh => {
                self.first_index = (resolution.leading_nulls + resolution.offset) as isize;
                self.last_index = self.first_index + resolution.data.len() as isize - 1;
                self.first_item = resolution.data.first().cloned();
                self.last_item = resolution.data.last().cloned();
            }
        }
    }
}
