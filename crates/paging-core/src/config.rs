//! Window configuration: page size, prefetch distance, and memory bounds.

/// Value of [`Config::max_size`] that disables page dropping entirely.
pub const MAX_SIZE_UNBOUNDED: usize = usize::MAX;

const DEFAULT_INITIAL_PAGE_MULTIPLIER: usize = 3;

/// Configuration for a paged window, built with [`Config::builder`].
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of items loaded per page after the initial load.
    pub page_size: usize,
    /// How many items beyond the last accessed index are loaded proactively.
    pub prefetch_distance: usize,
    /// Requested size of the initial load; usually a multiple of `page_size`.
    pub initial_load_size_hint: usize,
    /// Whether unloaded-but-known positions are presented as placeholders.
    pub enable_placeholders: bool,
    /// Budget of loaded items before edge pages are dropped.
    pub max_size: usize,
}

impl Config {
    pub fn builder(page_size: usize) -> ConfigBuilder {
        ConfigBuilder {
            page_size,
            prefetch_distance: None,
            initial_load_size_hint: None,
            enable_placeholders: true,
            max_size: MAX_SIZE_UNBOUNDED,
        }
    }

    /// Minimum number of loaded items a trim must leave behind, so the
    /// freshly accessed region plus its prefetch band is never dropped.
    pub(crate) fn required_remainder(&self) -> usize {
        2 * self.prefetch_distance + self.page_size
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    page_size: usize,
    prefetch_distance: Option<usize>,
    initial_load_size_hint: Option<usize>,
    enable_placeholders: bool,
    max_size: usize,
}

impl ConfigBuilder {
    /// Defaults to `page_size` when unset.
    pub fn prefetch_distance(mut self, distance: usize) -> Self {
        self.prefetch_distance = Some(distance);
        self
    }

    /// Defaults to three pages when unset.
    pub fn initial_load_size_hint(mut self, hint: usize) -> Self {
        self.initial_load_size_hint = Some(hint);
        self
    }

    pub fn enable_placeholders(mut self, enable: bool) -> Self {
        self.enable_placeholders = enable;
        self
    }

    /// Defaults to [`MAX_SIZE_UNBOUNDED`] when unset.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Panics if the configuration is inconsistent: a zero page size, or a
    /// bounded `max_size` too small to hold one page plus the prefetch band
    /// on both sides (such a window would thrash, loading and dropping the
    /// same pages).
    pub fn build(self) -> Config {
        assert!(self.page_size > 0, "page size must be positive");
        let prefetch_distance = self.prefetch_distance.unwrap_or(self.page_size);
        let initial_load_size_hint = self
            .initial_load_size_hint
            .unwrap_or(self.page_size * DEFAULT_INITIAL_PAGE_MULTIPLIER);
        if self.max_size != MAX_SIZE_UNBOUNDED {
            assert!(
                self.max_size >= self.page_size + 2 * prefetch_distance,
                "max_size ({}) must be at least page_size + 2 * prefetch_distance ({})",
                self.max_size,
                self.page_size + 2 * prefetch_distance,
            );
        }
        Config {
            page_size: self.page_size,
            prefetch_distance,
            initial_load_size_hint,
            enable_placeholders: self.enable_placeholders,
            max_size: self.max_size,
        }
    }
}
