//! # Worker: one submitted task, from slot wait to result.
//!
//! ## Flow
//! ```text
//! Dispatcher::submit() ──► tokio::spawn(worker.run())
//!
//!   ├─► race: acquire slot  vs  ctx.cancelled()      (cancel wins ties; skipped when unslotted)
//!   │       ├─ cancelled   ─► TaskCanceled,  Err(Canceled)   (executor never called)
//!   │       └─ slot        ─► SlotAcquired
//!   ├─► RetryPolicy::run_with(ctx, attempt ─► AttemptStarting + executor.execute)
//!   │       └─ on_backoff  ─► BackoffScheduled
//!   ├─► release slot (drop permit; also on panic)
//!   └─► publish TaskCompleted / TaskFailed / TaskCanceled, return the outcome
//! ```
//!
//! ## Rules
//! - The slot is held across all attempts and backoff sleeps of one task.
//! - An unslotted worker (no semaphore) goes straight to the retry loop.
//! - A panic inside the executor is contained and reported as
//!   [`DispatchError::Panicked`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    select,
    sync::{OwnedSemaphorePermit, Semaphore},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::DispatchError,
    events::{Bus, Event, EventKind},
    policies::RetryPolicy,
    subscribers::panic_message,
    tasks::{Executor, Task},
};

/// Executes one [`Task`] under the dispatcher's slot pool and retry policy.
pub(crate) struct Worker<E: Executor> {
    id: u64,
    task: Task<E>,
    semaphore: Option<Arc<Semaphore>>,
    retry: RetryPolicy,
    bus: Bus,
}

impl<E: Executor> Worker<E> {
    pub fn new(
        id: u64,
        task: Task<E>,
        semaphore: Option<Arc<Semaphore>>,
        retry: RetryPolicy,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            task,
            semaphore,
            retry,
            bus,
        }
    }

    /// Runs the task to its single outcome.
    pub async fn run(self) -> Result<E::Output, DispatchError> {
        let Self {
            id,
            task,
            semaphore,
            retry,
            bus,
        } = self;
        let (executor, input, ctx) = task.into_parts();
        let name = executor.name();

        let permit = match semaphore {
            Some(semaphore) => match acquire_slot(&ctx, semaphore).await {
                Ok(permit) => {
                    bus.publish(
                        Event::new(EventKind::SlotAcquired)
                            .with_task_id(id)
                            .with_task(name),
                    );
                    Some(permit)
                }
                Err(e) => {
                    let res = Err(e);
                    publish_outcome(&bus, id, name, &res);
                    return res;
                }
            },
            None => None,
        };

        let exec = executor.as_ref();
        let input = &input;
        let bus_ref = &bus;
        let attempt_ctx = &ctx;
        let attempts = retry.run_with(
            &ctx,
            move |attempt| {
                bus_ref.publish(
                    Event::new(EventKind::AttemptStarting)
                        .with_task_id(id)
                        .with_task(name)
                        .with_attempt(attempt + 1),
                );
                exec.execute(attempt_ctx.clone(), input)
            },
            |retry_idx, delay, err| {
                bus_ref.publish(
                    Event::new(EventKind::BackoffScheduled)
                        .with_task_id(id)
                        .with_task(name)
                        .with_attempt(retry_idx + 1)
                        .with_delay(delay)
                        .with_error_kind(err.kind())
                        .with_reason(err.message()),
                );
            },
        );

        let res = match AssertUnwindSafe(attempts).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(DispatchError::Panicked {
                reason: panic_message(panic.as_ref()),
            }),
        };
        drop(permit);

        publish_outcome(&bus, id, name, &res);
        res
    }
}

/// Waits for a slot unless `ctx` ends first.
async fn acquire_slot(
    ctx: &CancellationToken,
    semaphore: Arc<Semaphore>,
) -> Result<OwnedSemaphorePermit, DispatchError> {
    select! {
        biased;
        _ = ctx.cancelled() => Err(DispatchError::Canceled),
        acquired = semaphore.acquire_owned() => acquired.map_err(|_closed| DispatchError::Closed),
    }
}

/// Publishes the terminal event matching `res`.
fn publish_outcome<T>(bus: &Bus, id: u64, name: &str, res: &Result<T, DispatchError>) {
    let ev = match res {
        Ok(_) => Event::new(EventKind::TaskCompleted),
        Err(DispatchError::Canceled) => Event::new(EventKind::TaskCanceled),
        Err(e) => {
            let ev = Event::new(EventKind::TaskFailed).with_reason(e.to_string());
            match e.kind() {
                Some(kind) => ev.with_error_kind(kind),
                None => ev,
            }
        }
    };
    bus.publish(ev.with_task_id(id).with_task(name));
}
