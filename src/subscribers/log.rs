//! # LogWriter: event logger
//!
//! A subscriber that writes incoming [`Event`]s through `tracing`.
//! Lifecycle noise (`SlotAcquired`, `AttemptStarting`) is logged at `debug`,
//! retries at `info`, failures at `warn`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG dispatchvisor: submitted task_id=3 task="check-prompt"
//! INFO  dispatchvisor: backoff task_id=3 task="check-prompt" attempt=1 delay_ms=2000 kind=rate_limited
//! WARN  dispatchvisor: failed task_id=3 task="check-prompt" kind=rate_limited reason="..."
//! INFO  dispatchvisor: drained
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let kind = e.error_kind.map(|k| k.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::TaskSubmitted => {
                tracing::debug!(task_id = e.task_id, task, "submitted");
            }
            EventKind::SlotAcquired => {
                tracing::debug!(task_id = e.task_id, task, "slot acquired");
            }
            EventKind::AttemptStarting => {
                tracing::debug!(task_id = e.task_id, task, attempt = e.attempt, "attempt");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(
                    task_id = e.task_id,
                    task,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    kind,
                    "backoff"
                );
            }
            EventKind::TaskCompleted => {
                tracing::debug!(task_id = e.task_id, task, "completed");
            }
            EventKind::TaskFailed => {
                tracing::warn!(task_id = e.task_id, task, kind, reason, "failed");
            }
            EventKind::TaskCanceled => {
                tracing::info!(task_id = e.task_id, task, "canceled");
            }
            EventKind::TaskRejected => {
                tracing::warn!(task_id = e.task_id, task, "rejected: dispatcher closed");
            }
            EventKind::CloseRequested => {
                tracing::info!(in_flight = e.in_flight, "close requested");
            }
            EventKind::Drained => {
                tracing::info!("drained");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
