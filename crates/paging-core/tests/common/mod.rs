//! Shared setup for the end-to-end suites.

use std::sync::Arc;

use paging_core::{Config, DataSource, LoadKey, PagedList};
use paging_testing::{drain, TestExecutor};

/// Ten-item pages with a five-item prefetch band.
pub fn small_config() -> Config {
    Config::builder(10).prefetch_distance(5).build()
}

pub fn build_list(
    config: Config,
    source: Arc<dyn DataSource<usize, i32>>,
    key: Option<LoadKey<usize>>,
    notify: &TestExecutor,
    fetch: &TestExecutor,
) -> PagedList<usize, i32> {
    let future = PagedList::load_initial(
        config,
        source,
        Arc::new(notify.clone()),
        Arc::new(fetch.clone()),
        key,
    );
    drain(notify, fetch);
    future
        .peek()
        .expect("initial load did not resolve")
        .expect("initial load failed")
}
