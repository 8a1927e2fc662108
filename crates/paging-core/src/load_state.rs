//! Per-edge load states and the manager that deduplicates transitions.

use std::sync::Arc;

use crate::future::LoadError;

/// Which edge of the window a load (or state transition) belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LoadType {
    /// The initial load that seeds the window.
    Refresh,
    /// Loading before the first loaded item.
    Start,
    /// Loading after the last loaded item.
    End,
}

/// State of one load edge.
///
/// `Done` is terminal for the edge: an empty page was received and no further
/// loads will be attempted until the whole window is replaced. Errors never
/// retry automatically; `RetryableError` transitions back to `Loading` only
/// through an explicit retry call.
#[derive(Clone, Debug)]
pub enum LoadState {
    Idle,
    Loading,
    Done,
    Error(LoadError),
    RetryableError(LoadError),
}

impl LoadState {
    /// The error attached to this state, if it is an error state.
    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Error(e) | LoadState::RetryableError(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_retryable_error(&self) -> bool {
        matches!(self, LoadState::RetryableError(_))
    }
}

impl PartialEq for LoadState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoadState::Idle, LoadState::Idle)
            | (LoadState::Loading, LoadState::Loading)
            | (LoadState::Done, LoadState::Done) => true,
            (LoadState::Error(a), LoadState::Error(b))
            | (LoadState::RetryableError(a), LoadState::RetryableError(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Holds the current state of all three edges and reports actual changes.
#[derive(Debug)]
pub(crate) struct LoadStateManager {
    refresh: LoadState,
    start: LoadState,
    end: LoadState,
}

impl LoadStateManager {
    pub(crate) fn new() -> Self {
        Self {
            refresh: LoadState::Idle,
            start: LoadState::Idle,
            end: LoadState::Idle,
        }
    }

    pub(crate) fn get(&self, load_type: LoadType) -> &LoadState {
        match load_type {
            LoadType::Refresh => &self.refresh,
            LoadType::Start => &self.start,
            LoadType::End => &self.end,
        }
    }

    /// Records `state` for `load_type`; returns false if nothing changed so
    /// callers can skip redundant listener dispatch.
    pub(crate) fn set_state(&mut self, load_type: LoadType, state: LoadState) -> bool {
        let slot = match load_type {
            LoadType::Refresh => &mut self.refresh,
            LoadType::Start => &mut self.start,
            LoadType::End => &mut self.end,
        };
        if *slot == state {
            return false;
        }
        *slot = state;
        true
    }

    pub(crate) fn dispatch_current(&self, listener: &mut dyn FnMut(LoadType, &LoadState)) {
        listener(LoadType::Refresh, &self.refresh);
        listener(LoadType::Start, &self.start);
        listener(LoadType::End, &self.end);
    }
}
