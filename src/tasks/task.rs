//! # Submitted unit of work.
//!
//! A [`Task`] pairs an executor and its input with the caller's cancellation
//! context. It is immutable once handed to [`Dispatcher::submit`](crate::Dispatcher::submit).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::tasks::executor::Executor;

/// One executor call waiting for (or holding) a slot.
pub struct Task<E: Executor> {
    executor: Arc<E>,
    input: E::Input,
    ctx: CancellationToken,
}

impl<E: Executor> Task<E> {
    /// Creates a task bound to `ctx`.
    ///
    /// Cancelling `ctx` aborts the task at whichever suspension point it is in
    /// (slot wait, executor call, backoff sleep).
    pub fn new(executor: Arc<E>, input: E::Input, ctx: CancellationToken) -> Self {
        Self {
            executor,
            input,
            ctx,
        }
    }

    /// Convenience: returns the executor name.
    pub fn name(&self) -> &str {
        self.executor.name()
    }

    /// Returns the cancellation context.
    pub fn ctx(&self) -> &CancellationToken {
        &self.ctx
    }

    pub(crate) fn into_parts(self) -> (Arc<E>, E::Input, CancellationToken) {
        (self.executor, self.input, self.ctx)
    }
}
