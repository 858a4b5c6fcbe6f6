//! # Runtime events emitted by the dispatcher and its workers.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Task events**: one task's path from admission to delivery
//! - **Lifecycle events**: dispatcher shutdown (close requested, drained)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! executor name, attempt numbers and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use dispatchvisor::{ErrorKind, Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_task("check-prompt")
//!     .with_task_id(7)
//!     .with_attempt(1)
//!     .with_delay(Duration::from_secs(2))
//!     .with_error_kind(ErrorKind::RateLimited);
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::ErrorKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Dispatcher lifecycle ===
    /// `close()` flipped the dispatcher out of `Open`.
    ///
    /// Sets:
    /// - `in_flight`: outstanding tasks at the moment of the flip
    CloseRequested,

    /// Every admitted task delivered its result; the slot pool was released.
    Drained,

    // === Task events ===
    /// Task admitted; a worker was spawned.
    ///
    /// Sets:
    /// - `task_id`, `task`
    TaskSubmitted,

    /// Task refused because the dispatcher is closing or closed.
    ///
    /// Sets:
    /// - `task_id`, `task`
    TaskRejected,

    /// Worker obtained a slot and is about to call the executor.
    ///
    /// Sets:
    /// - `task_id`, `task`
    SlotAcquired,

    /// Executor attempt is starting.
    ///
    /// Sets:
    /// - `task_id`, `task`
    /// - `attempt`: attempt number (1-based)
    AttemptStarting,

    /// Retry scheduled after a transient failure.
    ///
    /// Sets:
    /// - `task_id`, `task`
    /// - `attempt`: the attempt that failed (1-based)
    /// - `delay_ms`: delay before the next attempt
    /// - `error_kind`, `reason`: the transient failure
    BackoffScheduled,

    /// Task produced a value.
    ///
    /// Sets:
    /// - `task_id`, `task`
    TaskCompleted,

    /// Task ended with a terminal, exhausted or panic outcome.
    ///
    /// Sets:
    /// - `task_id`, `task`
    /// - `reason`: error message
    /// - `error_kind`: executor error kind, if any
    TaskFailed,

    /// Task context ended before completion.
    ///
    /// Sets:
    /// - `task_id`, `task`
    TaskCanceled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Dispatcher-local task identifier.
    pub task_id: Option<u64>,
    /// Executor name, if applicable.
    pub task: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (error message).
    pub reason: Option<Arc<str>>,
    /// Classification of the executor error behind this event.
    pub error_kind: Option<ErrorKind>,
    /// Outstanding task count, where relevant.
    pub in_flight: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            task: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            error_kind: None,
            in_flight: None,
        }
    }

    #[inline]
    pub fn with_task_id(mut self, id: u64) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches an executor name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    #[inline]
    pub fn with_in_flight(mut self, n: usize) -> Self {
        self.in_flight = Some(n);
        self
    }
}
