//! Page-chunked backing storage for a paged window.
//!
//! Holds the loaded pages plus counts of known-but-unloaded positions on
//! either side, and presents the whole as one logical list. Two modes:
//!
//! Contiguous - every slot is loaded, page widths may vary, lookups walk the
//! page list. Only edge extension is possible.
//!
//! Tiled - all pages share one width (except possibly the last), so lookups
//! divide. Slots may be empty or placeholders while content is in flight,
//! which permits out-of-order (jump) loading.
//!
//! This module only holds data; it knows nothing about async loads or
//! prefetching. Mutations report what changed through [`PageEvent`]s pushed
//! into a caller-supplied buffer, so the window can dispatch notifications
//! after releasing its locks.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::adjacent::{AdjacentProvider, PageResolution};

/// One slot in the page list.
#[derive(Debug)]
pub(crate) enum PageSlot<V> {
    /// Allocated tiled slot with nothing requested yet.
    Empty,
    /// Tiled slot with a load in flight.
    Placeholder,
    /// Loaded data; shared with snapshots.
    Loaded(Arc<Vec<V>>),
}

// cloning shares the page, it never clones items
impl<V> Clone for PageSlot<V> {
    fn clone(&self) -> Self {
        match self {
            PageSlot::Empty => PageSlot::Empty,
            PageSlot::Placeholder => PageSlot::Placeholder,
            PageSlot::Loaded(page) => PageSlot::Loaded(Arc::clone(page)),
        }
    }
}

impl<V> PageSlot<V> {
    fn is_loaded(&self) -> bool {
        matches!(self, PageSlot::Loaded(_))
    }

    /// Items this slot stands for; non-loaded slots are `page_size` wide.
    fn width(&self, page_size: usize) -> usize {
        match self {
            PageSlot::Loaded(page) => page.len(),
            _ => page_size,
        }
    }

    fn loaded_len(&self) -> usize {
        match self {
            PageSlot::Loaded(page) => page.len(),
            _ => 0,
        }
    }
}

/// A structural change to the storage, to be translated into consumer
/// notifications by the owning window.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum PageEvent {
    Initialized { count: usize },
    Prepended { leading_nulls: usize, changed: usize, added: usize },
    Appended { end_position: usize, changed: usize, added: usize },
    PagesRemoved { start: usize, count: usize },
    PagesSwappedToPlaceholder { start: usize, count: usize },
    PlaceholderInserted { page_index: usize },
    PageInserted { start: usize, count: usize },
}

pub(crate) type PageEvents = SmallVec<[PageEvent; 4]>;

pub(crate) struct PagedStorage<V> {
    leading_null_count: usize,
    pages: Vec<PageSlot<V>>,
    trailing_null_count: usize,
    /// Logical index of the first slot when the data set is uncounted or has
    /// shrunk through non-placeholder trims; keeps index translation stable.
    position_offset: isize,
    /// Items held by loaded slots only; this is the count trimming works on.
    loaded_count: usize,
    /// Items represented by all slots, loaded or not.
    storage_count: usize,
    /// Fixed page width; 0 once widths diverge and lookups must walk.
    page_size: usize,
    number_prepended: usize,
    number_appended: usize,
}

impl<V> PagedStorage<V> {
    pub(crate) fn new() -> Self {
        Self {
            leading_null_count: 0,
            pages: Vec::new(),
            trailing_null_count: 0,
            position_offset: 0,
            loaded_count: 0,
            storage_count: 0,
            page_size: 1,
            number_prepended: 0,
            number_appended: 0,
        }
    }

    pub(crate) fn init(
        &mut self,
        leading_nulls: usize,
        page: Arc<Vec<V>>,
        trailing_nulls: usize,
        position_offset: isize,
        events: &mut PageEvents,
    ) {
        self.leading_null_count = leading_nulls;
        self.trailing_null_count = trailing_nulls;
        self.position_offset = position_offset;
        self.loaded_count = page.len();
        self.storage_count = page.len();
        // treated as tiled until page widths diverge
        self.page_size = page.len();
        self.pages.clear();
        self.pages.push(PageSlot::Loaded(page));
        self.number_prepended = 0;
        self.number_appended = 0;
        events.push(PageEvent::Initialized { count: self.size() });
    }

    /// Structural copy; pages are shared, not cloned.
    pub(crate) fn snapshot(&self) -> Self {
        Self {
            leading_null_count: self.leading_null_count,
            pages: self.pages.clone(),
            trailing_null_count: self.trailing_null_count,
            position_offset: self.position_offset,
            loaded_count: self.loaded_count,
            storage_count: self.storage_count,
            page_size: self.page_size,
            number_prepended: self.number_prepended,
            number_appended: self.number_appended,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.leading_null_count + self.storage_count + self.trailing_null_count
    }

    pub(crate) fn leading_null_count(&self) -> usize {
        self.leading_null_count
    }

    pub(crate) fn trailing_null_count(&self) -> usize {
        self.trailing_null_count
    }

    pub(crate) fn position_offset(&self) -> isize {
        self.position_offset
    }

    pub(crate) fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub(crate) fn storage_count(&self) -> usize {
        self.storage_count
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn number_prepended(&self) -> usize {
        self.number_prepended
    }

    pub(crate) fn number_appended(&self) -> usize {
        self.number_appended
    }

    pub(crate) fn is_tiled(&self) -> bool {
        self.page_size > 0
    }

    /// Midpoint of the currently loaded range, in logical coordinates. Used
    /// as the reference point when deciding which edge to trim.
    pub(crate) fn middle_of_loaded_range(&self) -> isize {
        (self.leading_null_count + self.storage_count / 2) as isize + self.position_offset
    }

    /// Value at logical `index`, or `None` inside a null region or a
    /// non-loaded slot. Panics when `index` is outside `[0, size)`.
    pub(crate) fn get(&self, index: usize) -> Option<&V> {
        assert!(
            index < self.size(),
            "index {index} out of bounds for size {}",
            self.size()
        );

        let local_index = index.checked_sub(self.leading_null_count)?;
        if local_index >= self.storage_count {
            return None;
        }

        let (page_index, page_internal_index) = if self.is_tiled() {
            (local_index / self.page_size, local_index % self.page_size)
        } else {
            // widths are irregular; walk to the right page
            let mut remaining = local_index;
            let mut page_index = 0;
            while page_index < self.pages.len() {
                let width = self.pages[page_index].width(self.page_size);
                if width > remaining {
                    break;
                }
                remaining -= width;
                page_index += 1;
            }
            (page_index, remaining)
        };

        match self.pages.get(page_index) {
            Some(PageSlot::Loaded(page)) => page.get(page_internal_index),
            _ => None,
        }
    }

    /// Leading nulls plus any leading run of non-loaded slots.
    pub(crate) fn compute_leading_nulls(&self) -> usize {
        let mut total = self.leading_null_count;
        for slot in &self.pages {
            if slot.is_loaded() {
                break;
            }
            total += self.page_size;
        }
        total
    }

    /// Trailing nulls plus any trailing run of non-loaded slots.
    pub(crate) fn compute_trailing_nulls(&self) -> usize {
        let mut total = self.trailing_null_count;
        for slot in self.pages.iter().rev() {
            if slot.is_loaded() {
                break;
            }
            total += self.page_size;
        }
        total
    }

    // ---------------- trimming ----------------
    //
    // Trimming only happens at the edges. We never trim below two pages: the
    // viewport position is not precisely known, so with a single page left
    // any trim could drop content the consumer is looking at.

    fn needs_trim(&self, max_size: usize, required_remaining: usize, page_index: usize) -> bool {
        if self.pages.is_empty() {
            return false;
        }
        match &self.pages[page_index] {
            // an empty tiled slot holds no data; always reclaimable
            PageSlot::Empty => true,
            // a load is in flight for this range; leave it alone
            PageSlot::Placeholder => false,
            PageSlot::Loaded(page) => {
                self.loaded_count > max_size
                    && self.pages.len() > 2
                    && self.loaded_count - page.len() >= required_remaining
            }
        }
    }

    pub(crate) fn needs_trim_from_front(&self, max_size: usize, required_remaining: usize) -> bool {
        self.needs_trim(max_size, required_remaining, 0)
    }

    pub(crate) fn needs_trim_from_end(&self, max_size: usize, required_remaining: usize) -> bool {
        self.needs_trim(max_size, required_remaining, self.pages.len().saturating_sub(1))
    }

    /// Whether accepting a page of `count_to_be_added` items would
    /// immediately require a trim. Callers drop the incoming page instead of
    /// inserting and trimming it back out, avoiding a spurious insert/remove
    /// notification pair.
    pub(crate) fn should_pre_trim_new_page(
        &self,
        max_size: usize,
        required_remaining: usize,
        count_to_be_added: usize,
    ) -> bool {
        self.loaded_count + count_to_be_added > max_size
            && self.pages.len() > 1
            && self.loaded_count >= required_remaining
    }

    pub(crate) fn trim_from_front(
        &mut self,
        insert_nulls: bool,
        max_size: usize,
        required_remaining: usize,
        events: &mut PageEvents,
    ) -> bool {
        let mut total_removed = 0;
        while self.needs_trim_from_front(max_size, required_remaining) {
            let slot = self.pages.remove(0);
            let removed = slot.width(self.page_size);
            total_removed += removed;
            self.storage_count -= removed;
            self.loaded_count -= slot.loaded_len();
        }

        if total_removed > 0 {
            log::trace!("trimmed {total_removed} items from front");
            if insert_nulls {
                let previous_leading = self.leading_null_count;
                self.leading_null_count += total_removed;
                events.push(PageEvent::PagesSwappedToPlaceholder {
                    start: previous_leading,
                    count: total_removed,
                });
            } else {
                self.position_offset += total_removed as isize;
                events.push(PageEvent::PagesRemoved {
                    start: self.leading_null_count,
                    count: total_removed,
                });
            }
        }
        total_removed > 0
    }

    pub(crate) fn trim_from_end(
        &mut self,
        insert_nulls: bool,
        max_size: usize,
        required_remaining: usize,
        events: &mut PageEvents,
    ) -> bool {
        let mut total_removed = 0;
        while self.needs_trim_from_end(max_size, required_remaining) {
            let slot = self.pages.remove(self.pages.len() - 1);
            let removed = slot.width(self.page_size);
            total_removed += removed;
            self.storage_count -= removed;
            self.loaded_count -= slot.loaded_len();
        }

        if total_removed > 0 {
            log::trace!("trimmed {total_removed} items from end");
            let new_end_position = self.leading_null_count + self.storage_count;
            if insert_nulls {
                self.trailing_null_count += total_removed;
                events.push(PageEvent::PagesSwappedToPlaceholder {
                    start: new_end_position,
                    count: total_removed,
                });
            } else {
                events.push(PageEvent::PagesRemoved {
                    start: new_end_position,
                    count: total_removed,
                });
            }
        }
        total_removed > 0
    }

    // ---------------- contiguous API ----------------

    pub(crate) fn prepend_page(&mut self, page: Arc<Vec<V>>, events: &mut PageEvents) {
        let count = page.len();
        if count == 0 {
            return;
        }
        if self.page_size > 0 && count != self.page_size {
            if self.pages.len() == 1 && count > self.page_size {
                // prepending to a single page: adopt the wider inner width
                self.page_size = count;
            } else {
                self.page_size = 0;
            }
        }

        self.pages.insert(0, PageSlot::Loaded(page));
        self.loaded_count += count;
        self.storage_count += count;

        let changed = self.leading_null_count.min(count);
        let added = count - changed;
        self.leading_null_count -= changed;
        self.position_offset -= added as isize;
        self.number_prepended += count;

        events.push(PageEvent::Prepended {
            leading_nulls: self.leading_null_count,
            changed,
            added,
        });
    }

    pub(crate) fn append_page(&mut self, page: Arc<Vec<V>>, events: &mut PageEvents) {
        let count = page.len();
        if count == 0 {
            return;
        }
        if self.page_size > 0 && count != self.page_size {
            if self.pages.len() == 1 && count > self.page_size {
                // appending to a single page: adopt the wider inner width
                self.page_size = count;
            } else {
                self.page_size = 0;
            }
        }

        self.pages.push(PageSlot::Loaded(page));
        self.loaded_count += count;
        self.storage_count += count;

        let changed = self.trailing_null_count.min(count);
        let added = count - changed;
        self.trailing_null_count -= changed;
        self.number_appended += count;

        events.push(PageEvent::Appended {
            end_position: self.leading_null_count + self.storage_count - count,
            changed,
            added,
        });
    }

    // ---------------- tiled API ----------------

    /// Whether the page at `position_of_page` would be the outermost loaded
    /// page on the `trim_from_front` side. Panics before a sufficient load,
    /// since the question is meaningless without tiling and two pages.
    pub(crate) fn page_would_be_boundary(
        &self,
        position_of_page: usize,
        trim_from_front: bool,
    ) -> bool {
        assert!(
            self.page_size > 0 && self.pages.len() >= 2,
            "trimming attempt before sufficient load"
        );

        if position_of_page < self.leading_null_count {
            return trim_from_front;
        }
        if position_of_page >= self.leading_null_count + self.storage_count {
            return !trim_from_front;
        }

        let local_page_index = (position_of_page - self.leading_null_count) / self.page_size;
        // walk outside in; any loaded page closer to the edge means this one
        // is interior
        if trim_from_front {
            !self.pages[..local_page_index].iter().any(PageSlot::is_loaded)
        } else {
            !self.pages[local_page_index + 1..]
                .iter()
                .any(PageSlot::is_loaded)
        }
    }

    /// Ensures slots exist for pages `minimum_page..=maximum_page`,
    /// converting null counts into empty slots as needed.
    pub(crate) fn allocate_page_range(&mut self, minimum_page: usize, maximum_page: usize) {
        let mut leading_null_pages = self.leading_null_count / self.page_size;

        if minimum_page < leading_null_pages {
            for _ in 0..leading_null_pages - minimum_page {
                self.pages.insert(0, PageSlot::Empty);
            }
            let allocated = (leading_null_pages - minimum_page) * self.page_size;
            self.storage_count += allocated;
            self.leading_null_count -= allocated;
            leading_null_pages = minimum_page;
        }
        if maximum_page >= leading_null_pages + self.pages.len() {
            let allocated = self
                .trailing_null_count
                .min((maximum_page + 1 - (leading_null_pages + self.pages.len())) * self.page_size);
            for _ in self.pages.len()..=maximum_page - leading_null_pages {
                self.pages.push(PageSlot::Empty);
            }
            self.storage_count += allocated;
            self.trailing_null_count -= allocated;
        }
    }

    /// Inserts a loaded page at logical `position` (tiled mode). Panics if
    /// the page breaks the tiling or the slot already holds data.
    pub(crate) fn insert_page(
        &mut self,
        position: usize,
        page: Arc<Vec<V>>,
        events: Option<&mut PageEvents>,
    ) {
        let new_page_size = page.len();
        if new_page_size != self.page_size {
            // differing width is fine in exactly two cases: a short final
            // page, or widening when the only page present is the last one
            let size = self.size();
            let adding_last_page =
                position == size - size % self.page_size && new_page_size < self.page_size;
            let only_end_page_present = self.trailing_null_count == 0
                && self.pages.len() == 1
                && new_page_size > self.page_size;
            assert!(
                only_end_page_present || adding_last_page,
                "page introduces incorrect tiling"
            );
            if only_end_page_present {
                self.page_size = new_page_size;
            }
        }

        let page_index = position / self.page_size;
        self.allocate_page_range(page_index, page_index);

        let local_page_index = page_index - self.leading_null_count / self.page_size;
        assert!(
            !self.pages[local_page_index].is_loaded(),
            "invalid position {position}: data already loaded"
        );
        self.pages[local_page_index] = PageSlot::Loaded(page);
        self.loaded_count += new_page_size;
        if let Some(events) = events {
            events.push(PageEvent::PageInserted {
                start: position,
                count: new_page_size,
            });
        }
    }

    /// Marks every unrequested slot within `prefetch_distance` of `index` as
    /// a placeholder, reporting each so loads can be scheduled for them.
    pub(crate) fn allocate_placeholders(
        &mut self,
        index: usize,
        prefetch_distance: usize,
        page_size: usize,
        events: &mut PageEvents,
    ) {
        if page_size != self.page_size {
            assert!(page_size >= self.page_size, "page size cannot be reduced");
            assert!(
                self.pages.len() == 1 && self.trailing_null_count == 0,
                "page size can change only if the last page is the only one present"
            );
            self.page_size = page_size;
        }

        let max_page_count = (self.size() + self.page_size - 1) / self.page_size;
        let minimum_page = index.saturating_sub(prefetch_distance) / self.page_size;
        let maximum_page = ((index + prefetch_distance) / self.page_size).min(max_page_count - 1);

        self.allocate_page_range(minimum_page, maximum_page);
        let leading_null_pages = self.leading_null_count / self.page_size;
        for page_index in minimum_page..=maximum_page {
            let local_page_index = page_index - leading_null_pages;
            if matches!(self.pages[local_page_index], PageSlot::Empty) {
                self.pages[local_page_index] = PageSlot::Placeholder;
                events.push(PageEvent::PlaceholderInserted { page_index });
            }
        }
    }

    pub(crate) fn has_page(&self, page_size: usize, page_index: usize) -> bool {
        // page_size is passed in because self.page_size may not be settled
        // while only the final short page is loaded
        let leading_null_pages = self.leading_null_count / page_size;
        if page_index < leading_null_pages
            || page_index >= leading_null_pages + self.pages.len()
        {
            return false;
        }
        self.pages[page_index - leading_null_pages].is_loaded()
    }
}

impl<V> std::fmt::Debug for PagedStorage<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "leading {}, storage {} ({} loaded, {} pages), trailing {}",
            self.leading_null_count,
            self.storage_count,
            self.loaded_count,
            self.pages.len(),
            self.trailing_null_count
        )
    }
}

// The wired-up window hands its storage to the pager as the adjacent
// provider: indices and items are derived from committed pages, so pages
// dropped before insertion never influence key derivation.
impl<V: Clone> AdjacentProvider<V> for PagedStorage<V> {
    fn first_loaded_item(&self) -> Option<V> {
        match self.pages.first()? {
            PageSlot::Loaded(page) => page.first().cloned(),
            _ => None,
        }
    }

    fn last_loaded_item(&self) -> Option<V> {
        match self.pages.last()? {
            PageSlot::Loaded(page) => page.last().cloned(),
            _ => None,
        }
    }

    fn first_loaded_index(&self) -> isize {
        self.leading_null_count as isize + self.position_offset
    }

    fn last_loaded_index(&self) -> isize {
        (self.leading_null_count + self.storage_count) as isize + self.position_offset - 1
    }

    fn on_page_resolved(&mut self, _resolution: PageResolution<'_, V>) {
        // state is inherent in the committed pages
    }
}
