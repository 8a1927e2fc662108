//! Window behavior under trimming, boundaries, snapshots, and observers.

mod common;

use std::sync::Arc;

use paging_testing::{
    drain, BoundaryEvent, KeyedListDataSource, ListChange, ListDataSource, RecordingBoundary,
    RecordingCallback, StateRecorder, TestExecutor,
};

use paging_core::{
    Config, ListUpdateCallback, LoadKey, LoadState, LoadType, PagedList, SnapshotError,
};

use common::{build_list, small_config};

fn bounded_config() -> Config {
    Config::builder(10)
        .prefetch_distance(5)
        .max_size(30)
        .build()
}

#[test]
fn scrolling_forward_keeps_loaded_items_bounded() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        bounded_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(0)),
        &notify,
        &fetch,
    );

    for index in (0..100).step_by(5) {
        list.load_around(index);
        drain(&notify, &fetch);
        // the wide initial page cannot be split, so two pages may briefly
        // hold more than the budget
        assert!(list.loaded_count() <= 40);
        assert_eq!(list.size(), 100);
    }

    assert_eq!(list.loaded_count(), 30);
    assert_eq!(list.get(99), Some(99));
    // trimmed pages read as placeholders again
    assert_eq!(list.get(0), None);
}

#[test]
fn scrolling_backward_trims_the_end() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        bounded_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(70)),
        &notify,
        &fetch,
    );
    assert_eq!(list.get(99), Some(99));

    for index in (0..=70).rev().step_by(5) {
        list.load_around(index);
        drain(&notify, &fetch);
        assert!(list.loaded_count() <= 40);
    }

    assert_eq!(list.get(5), Some(5));
    assert_eq!(list.get(95), None);
    assert_eq!(list.size(), 100);
}

#[test]
fn unbounded_config_never_trims() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(0)),
        &notify,
        &fetch,
    );

    for index in (0..100).step_by(5) {
        list.load_around(index);
        drain(&notify, &fetch);
    }
    assert_eq!(list.loaded_count(), 100);
    assert_eq!(list.get(0), Some(0));
}

#[test]
fn page_for_far_away_access_is_dropped_before_insertion() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting_manual(100));
    let config = Config::builder(10)
        .prefetch_distance(5)
        .initial_load_size_hint(10)
        .max_size(30)
        .build();
    let future = PagedList::load_initial(
        config,
        Arc::clone(&source) as _,
        Arc::new(notify.clone()),
        Arc::new(fetch.clone()),
        Some(LoadKey::Position(0)),
    );
    source.complete_next();
    drain(&notify, &fetch);
    let list = future.peek().unwrap().unwrap();

    // grow to the budget, one page at a time
    for index in [9, 19] {
        list.load_around(index);
        source.complete_next();
        drain(&notify, &fetch);
    }
    assert_eq!(list.loaded_count(), 30);

    // an append is in flight when the access point jumps to the front
    list.load_around(29);
    list.load_around(0);
    source.complete_next();
    drain(&notify, &fetch);

    // the page landed near the cold edge and was dropped, not inserted
    assert_eq!(list.loaded_count(), 30);
    assert_eq!(list.get(30), None);
    assert_eq!(list.size(), 100);

    // the drop left no trace in adjacency: the next append reloads the
    // exact same range
    list.load_around(29);
    source.complete_next();
    drain(&notify, &fetch);
    assert_eq!(list.get(35), Some(35));

    let params = source.recorded_params();
    assert_eq!(params[3].key, params[4].key);
}

#[test]
fn dropped_page_keyed_page_is_requested_again() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let pages: Vec<Vec<i32>> = (0..6).map(|p| (p * 10..p * 10 + 10).collect()).collect();
    let source = Arc::new(KeyedListDataSource::manual(pages).allow_page_dropping());
    let future = PagedList::load_initial(
        bounded_config(),
        Arc::clone(&source) as _,
        Arc::new(notify.clone()),
        Arc::new(fetch.clone()),
        None,
    );
    source.complete_next();
    drain(&notify, &fetch);
    let list = future.peek().unwrap().unwrap();

    // grow to the budget, one page at a time
    for index in [9, 19] {
        list.load_around(index);
        source.complete_next();
        drain(&notify, &fetch);
    }
    assert_eq!(list.loaded_count(), 30);

    // an append is in flight when the access point jumps to the front
    list.load_around(29);
    list.load_around(0);
    source.complete_next();
    drain(&notify, &fetch);
    assert_eq!(list.loaded_count(), 30);

    // the dropped page did not advance the token; the next append asks
    // for it again and the window slides forward without a gap
    list.load_around(29);
    source.complete_next();
    drain(&notify, &fetch);

    assert_eq!(list.size(), 30);
    for index in 0..list.size() {
        assert_eq!(list.get(index), Some(10 + index as i32));
    }

    let keys: Vec<Option<LoadKey<usize>>> = source
        .recorded_params()
        .into_iter()
        .map(|params| params.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            None,
            Some(LoadKey::Key(1)),
            Some(LoadKey::Key(2)),
            Some(LoadKey::Key(3)),
            Some(LoadKey::Key(3)),
        ]
    );
}

#[test]
fn boundary_callback_fires_once_per_edge() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(20));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(0)),
        &notify,
        &fetch,
    );
    assert_eq!(list.loaded_count(), 20);

    let boundary = RecordingBoundary::new();
    list.set_boundary_callback(Box::new(boundary.clone()));
    notify.flush();
    assert_eq!(boundary.take(), vec![]);

    list.load_around(19);
    drain(&notify, &fetch);
    list.load_around(0);
    drain(&notify, &fetch);
    assert_eq!(
        boundary.take(),
        vec![BoundaryEvent::End(19), BoundaryEvent::Front(0)]
    );

    // edges stay resolved; no further signals
    list.load_around(19);
    list.load_around(0);
    drain(&notify, &fetch);
    assert_eq!(boundary.take(), vec![]);
}

#[test]
fn empty_initial_load_signals_zero_items() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(0));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        None,
        &notify,
        &fetch,
    );
    assert_eq!(list.size(), 0);

    let boundary = RecordingBoundary::new();
    list.set_boundary_callback(Box::new(boundary.clone()));
    notify.flush();
    assert_eq!(boundary.take(), vec![BoundaryEvent::ZeroItems]);
}

#[test]
fn diff_since_snapshot_marks_filled_placeholders() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(40)),
        &notify,
        &fetch,
    );

    let snapshot = list.snapshot();
    list.load_around(67);
    drain(&notify, &fetch);
    list.load_around(41);
    drain(&notify, &fetch);

    let mut recorder = RecordingCallback::new();
    list.dispatch_updates_since_snapshot(&snapshot, &mut recorder)
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            ListChange::Changed {
                position: 70,
                count: 10
            },
            ListChange::Changed {
                position: 30,
                count: 10
            },
        ]
    );
}

/// Replays positional ops onto a model of the snapshot, to check the delta
/// transforms snapshot contents into current contents.
struct Model {
    items: Vec<Option<i32>>,
}

impl ListUpdateCallback for Model {
    fn on_inserted(&mut self, position: usize, count: usize) {
        for _ in 0..count {
            self.items.insert(position, None);
        }
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        self.items.drain(position..position + count);
    }

    fn on_changed(&mut self, position: usize, count: usize) {
        for slot in &mut self.items[position..position + count] {
            *slot = None;
        }
    }
}

#[test]
fn diff_since_snapshot_transforms_old_contents_into_new() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let pages: Vec<Vec<i32>> = (0..5).map(|p| (p * 10..p * 10 + 10).collect()).collect();
    let source = Arc::new(KeyedListDataSource::new(pages));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Key(2)),
        &notify,
        &fetch,
    );
    assert_eq!(list.get(0), Some(20));

    let snapshot = list.snapshot();
    list.load_around(9);
    drain(&notify, &fetch);
    list.load_around(0);
    drain(&notify, &fetch);
    assert_eq!(list.size(), 30);

    let mut model = Model {
        items: (0..snapshot.size()).map(|i| snapshot.get(i)).collect(),
    };
    list.dispatch_updates_since_snapshot(&snapshot, &mut model)
        .unwrap();

    assert_eq!(model.items.len(), list.size());
    for (index, item) in model.items.iter().enumerate() {
        if let Some(item) = item {
            assert_eq!(list.get(index), Some(*item));
        }
    }
}

#[test]
fn empty_snapshot_is_rejected() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(0));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        None,
        &notify,
        &fetch,
    );
    let snapshot = list.snapshot();
    let mut recorder = RecordingCallback::new();
    assert_eq!(
        list.dispatch_updates_since_snapshot(&snapshot, &mut recorder),
        Err(SnapshotError::EmptySnapshot)
    );
}

#[test]
fn snapshot_predating_a_trim_is_rejected() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        bounded_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(0)),
        &notify,
        &fetch,
    );

    let snapshot = list.snapshot();
    for index in (0..100).step_by(5) {
        list.load_around(index);
        drain(&notify, &fetch);
    }
    assert_eq!(list.get(0), None); // front was trimmed

    let mut recorder = RecordingCallback::new();
    assert_eq!(
        list.dispatch_updates_since_snapshot(&snapshot, &mut recorder),
        Err(SnapshotError::NotAncestor)
    );
}

#[test]
fn callback_with_snapshot_replays_then_goes_live() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(40)),
        &notify,
        &fetch,
    );

    let snapshot = list.snapshot();
    list.load_around(67);
    drain(&notify, &fetch);

    let recorder = RecordingCallback::new();
    list.add_callback_with_snapshot(&snapshot, Box::new(recorder.clone()))
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec![ListChange::Changed {
            position: 70,
            count: 10
        }]
    );

    list.load_around(41);
    drain(&notify, &fetch);
    assert_eq!(
        recorder.take(),
        vec![ListChange::Changed {
            position: 30,
            count: 10
        }]
    );
}

#[test]
#[should_panic(expected = "out of bounds")]
fn get_past_the_end_panics() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(40)),
        &notify,
        &fetch,
    );
    let _ = list.get(100);
}

#[test]
fn placeholder_positions_read_as_none() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(ListDataSource::counting(100));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        Some(LoadKey::Position(40)),
        &notify,
        &fetch,
    );
    assert_eq!(list.get(0), None);
    assert_eq!(list.get(39), None);
    assert_eq!(list.get(40), Some(40));
    assert_eq!(list.get(70), None);
}

#[test]
fn late_state_listener_receives_current_states_first() {
    let notify = TestExecutor::new();
    let fetch = TestExecutor::new();
    let source = Arc::new(KeyedListDataSource::new(vec![(0..10).collect()]));
    let list = build_list(
        small_config(),
        Arc::clone(&source) as _,
        None,
        &notify,
        &fetch,
    );

    // exhaust the front edge before anyone listens
    list.load_around(0);
    drain(&notify, &fetch);

    let recorder = StateRecorder::new();
    list.add_load_state_listener(recorder.listener());
    assert_eq!(recorder.last_for(LoadType::Start), Some(LoadState::Done));
    assert_eq!(recorder.last_for(LoadType::End), Some(LoadState::Idle));
    assert_eq!(recorder.last_for(LoadType::Refresh), Some(LoadState::Idle));
}

#[test]
fn both_edges_can_load_concurrently() {
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

    list.load_around(41);
    list.load_around(67);
    assert_eq!(source.pending_loads(), 2);

    source.complete_next();
    drain(&notify, &fetch);
    source.complete_next();
    drain(&notify, &fetch);

    assert_eq!(list.loaded_count(), 50);
    assert_eq!(list.get(35), Some(35));
    assert_eq!(list.get(75), Some(75));
}
