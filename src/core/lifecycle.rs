//! # Dispatcher lifecycle: admission gate and drain.
//!
//! ```text
//!   Open ──close()──► Closing ──(outstanding == 0)──► Closed
//! ```
//!
//! ## Rules
//! - `admit()` takes the read side of the state lock; it hands out a tracker token
//!   only while `Open`, so no task slips in after `close()` flips the state.
//! - `begin_close()` takes the write side exactly once per transition; later calls
//!   observe `Closing`/`Closed` and return `false` without waiting.
//! - Outstanding work is counted with [`TaskTracker`] tokens held by every worker
//!   (single and batch alike) until its result is delivered.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio_util::task::{TaskTracker, task_tracker::TaskTrackerToken};

/// Observable state of a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    /// Accepting submissions.
    Open,
    /// Refusing submissions, waiting for outstanding tasks.
    Closing,
    /// Drained; the slot pool is released.
    Closed,
}

/// Admission gate plus outstanding-work counter.
pub(crate) struct Lifecycle {
    state: RwLock<DispatcherState>,
    tracker: TaskTracker,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DispatcherState::Open),
            tracker: TaskTracker::new(),
        }
    }

    /// Registers one outstanding task, or returns `None` once closing has begun.
    ///
    /// The token must be held until the task's result is delivered.
    pub fn admit(&self) -> Option<TaskTrackerToken> {
        let state = self.read();
        match *state {
            DispatcherState::Open => Some(self.tracker.token()),
            DispatcherState::Closing | DispatcherState::Closed => None,
        }
    }

    /// Flips `Open` to `Closing`. Returns `false` if another call already did.
    pub fn begin_close(&self) -> bool {
        let mut state = self.write();
        if *state != DispatcherState::Open {
            return false;
        }
        *state = DispatcherState::Closing;
        self.tracker.close();
        true
    }

    /// Waits until every admitted task has delivered its result.
    pub async fn drain(&self) {
        self.tracker.wait().await;
    }

    /// Marks the lifecycle terminal.
    pub fn finish(&self) {
        *self.write() = DispatcherState::Closed;
    }

    pub fn state(&self) -> DispatcherState {
        *self.read()
    }

    /// Number of admitted tasks that have not delivered yet.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    // The guarded value is a plain enum, so a poisoned lock still holds a valid state.
    fn read(&self) -> RwLockReadGuard<'_, DispatcherState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DispatcherState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
