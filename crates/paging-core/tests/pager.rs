//! Prefetch scheduling, key derivation, and error handling, observed through
//! the public list surface.

mod common;

use std::sync::Arc;

use paging_testing::{
    drain, KeyedListDataSource, ListDataSource, StateRecorder, TestExecutor, TestLoadError,
};

use paging_core::{
    Config, DataSource, KeyStyle, LoadFuture, LoadKey, LoadParams, LoadState, LoadType,
    PageResult, PagedList,
};

use common::{build_list, small_config};

fn positional_list(
    total: usize,
    position: isize,
) -> (
    PagedList<usize, i32>,
    Arc<ListDataSource<i32>>,
    TestExecutor,
    TestExecutor,
) {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(total));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(position)),
        &notify,
        &fetch,
    );
    (list, source, notify, fetch)
}

#[test]
fn access_within_window_loads_nothing() {
    let (list, source, notify, fetch) = positional_list(100, 40);
    assert_eq!(source.load_count(), 1);

    list.load_around(55);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 1);
    assert_eq!(list.loaded_count(), 30);
}

#[test]
fn access_near_end_triggers_one_append() {
    let (list, source, notify, fetch) = positional_list(100, 40);

    list.load_around(67);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
    assert_eq!(list.get(75), Some(75));
    // placeholders were filled in place
    assert_eq!(list.size(), 100);
}

#[test]
fn access_near_front_triggers_one_prepend() {
    let (list, source, notify, fetch) = positional_list(100, 40);

    list.load_around(41);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
    assert_eq!(list.get(35), Some(35));
    assert_eq!(list.size(), 100);
}

#[test]
fn page_keyed_terminal_token_resolves_done_without_loading() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(KeyedListDataSource::new(vec![
        (0..10).collect(),
        (10..20).collect(),
    ]));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        None,
        &notify,
        &fetch,
    );
    assert_eq!(list.size(), 10);

    list.load_around(9);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
    assert_eq!(list.size(), 20);

    // the last page carried no next token; the edge resolves without a call
    list.load_around(19);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
    assert_eq!(list.load_state(LoadType::End), LoadState::Done);

    // and Done is sticky
    list.load_around(19);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
}

#[test]
fn page_keyed_first_page_resolves_start_done() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(KeyedListDataSource::new(vec![
        (0..10).collect(),
        (10..20).collect(),
    ]));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        None,
        &notify,
        &fetch,
    );

    list.load_around(0);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 1);
    assert_eq!(list.load_state(LoadType::Start), LoadState::Done);
}

#[test]
fn page_keyed_burst_advances_tokens_each_page() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let pages: Vec<Vec<i32>> = (0..5).map(|p| (p * 10..p * 10 + 10).collect()).collect();
    let source = Arc::new(KeyedListDataSource::new(pages));
    let config = Config::builder(10).prefetch_distance(25).build();
    let list = build_list(config, Arc::clone(&source) as _, None, &notify, &fetch);

    // one access wants 25 items past the edge; the burst walks pages 1..=3
    list.load_around(9);
    drain(&notify, &fetch);
    assert_eq!(list.size(), 40);

    // the token recorded by the burst's final page drives the next load
    list.load_around(39);
    drain(&notify, &fetch);
    assert_eq!(list.size(), 50);
    assert_eq!(list.get(45), Some(45));

    let keys: Vec<Option<LoadKey<usize>>> = source
        .recorded_params()
        .into_iter()
        .skip(1)
        .map(|params| params.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            Some(LoadKey::Key(1)),
            Some(LoadKey::Key(2)),
            Some(LoadKey::Key(3)),
            Some(LoadKey::Key(4)),
        ]
    );
}

/// Item-keyed source over sorted integers; the key is the boundary value.
struct SortedSource {
    items: Vec<i32>,
}

impl DataSource<i32, i32> for SortedSource {
    fn key_style(&self) -> KeyStyle {
        KeyStyle::ItemKeyed
    }

    fn key_for(&self, item: &i32) -> Option<i32> {
        Some(*item)
    }

    fn load(&self, params: LoadParams<i32>) -> LoadFuture<PageResult<i32, i32>> {
        let data: Vec<i32> = match (params.load_type, params.key) {
            (LoadType::Refresh, key) => {
                let from = match key {
                    Some(LoadKey::Key(k)) => k,
                    _ => i32::MIN,
                };
                self.items
                    .iter()
                    .copied()
                    .filter(|item| *item >= from)
                    .take(params.load_size)
                    .collect()
            }
            (LoadType::End, Some(LoadKey::Key(k))) => self
                .items
                .iter()
                .copied()
                .filter(|item| *item > k)
                .take(params.page_size)
                .collect(),
            (LoadType::Start, Some(LoadKey::Key(k))) => {
                let mut below: Vec<i32> =
                    self.items.iter().copied().filter(|item| *item < k).collect();
                let keep = below.len().saturating_sub(params.page_size);
                below.split_off(keep)
            }
            _ => panic!("item-keyed source requires an item key"),
        };
        LoadFuture::ready(PageResult::new(data, None, None))
    }

    fn is_invalid(&self) -> bool {
        false
    }
}

#[test]
fn item_keyed_derives_keys_from_boundary_items() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(SortedSource {
        items: (0..100).collect(),
    });
    let future = PagedList::load_initial(
        small_config(),
        source,
        Arc::new(notify.clone()),
        Arc::new(fetch.clone()),
        Some(LoadKey::Key(50)),
    );
    drain(&notify, &fetch);
    let list: PagedList<i32, i32> = future.peek().unwrap().unwrap();
    assert_eq!(list.size(), 30);
    assert_eq!(list.get(0), Some(50));

    // append keys off the last loaded item
    list.load_around(29);
    drain(&notify, &fetch);
    assert_eq!(list.get(30), Some(80));

    // prepend keys off the first loaded item
    list.load_around(0);
    drain(&notify, &fetch);
    assert_eq!(list.get(0), Some(40));
    assert_eq!(list.size(), 50);
}

#[test]
fn retryable_error_reaches_state_and_retry_reissues_same_load() {
    let (list, source, notify, fetch) = positional_list(100, 40);
    let recorder = StateRecorder::new();
    list.add_load_state_listener(recorder.listener());

    source.fail_next(TestLoadError::retryable("timeout"));
    list.load_around(67);
    drain(&notify, &fetch);

    let state = recorder.last_for(LoadType::End).unwrap();
    assert!(state.is_retryable_error());
    assert_eq!(state.error().unwrap().to_string(), "timeout");
    assert_eq!(list.loaded_count(), 30);

    list.retry();
    drain(&notify, &fetch);
    assert_eq!(recorder.last_for(LoadType::End), Some(LoadState::Idle));
    assert_eq!(list.get(75), Some(75));

    let params = source.recorded_params();
    assert_eq!(params.len(), 3);
    // the retried load targets the position the failed one did
    assert_eq!(params[1].key, params[2].key);
}

#[test]
fn permanent_error_ignores_retry() {
    let (list, source, notify, fetch) = positional_list(100, 40);

    source.fail_next(TestLoadError::permanent("gone"));
    list.load_around(67);
    drain(&notify, &fetch);
    let state = list.load_state(LoadType::End);
    assert!(state.error().is_some());
    assert!(!state.is_retryable_error());

    list.retry();
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 2);
    assert!(list.load_state(LoadType::End).error().is_some());
}

#[test]
fn invalidated_source_detaches_and_drops_results() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting_manual(100));
    let future = PagedList::load_initial(
        small_config(),
        Arc::clone(&source) as _,
        Arc::new(notify.clone()),
        Arc::new(fetch.clone()),
        Some(LoadKey::Position(40)),
    );
    source.complete_next();
    drain(&notify, &fetch);
    let list = future.peek().unwrap().unwrap();

    list.load_around(67);
    assert_eq!(source.pending_loads(), 1);

    // invalidation lands between the load and its result
    source.invalidate();
    source.complete_next();
    drain(&notify, &fetch);

    assert!(list.is_detached());
    assert_eq!(list.loaded_count(), 30);
}

#[test]
fn detached_list_schedules_nothing() {
    let (list, source, notify, fetch) = positional_list(100, 40);

    list.detach();
    list.load_around(67);
    drain(&notify, &fetch);
    assert_eq!(source.load_count(), 1);
    assert_eq!(list.loaded_count(), 30);
}
