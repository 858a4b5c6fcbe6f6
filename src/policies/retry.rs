//! # Retry policy around one executor invocation.
//!
//! [`RetryPolicy`] runs an operation, classifies its failure by
//! [`ErrorKind`](crate::ErrorKind) and retries transient failures with backoff.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► op(attempt)                    (races ctx.cancelled())
//!   │     ├─ Ok(v)                     ─► return Ok(v)
//!   │     ├─ Err(terminal)             ─► return Terminal(err)
//!   │     └─ Err(transient):
//!   │           ├─ budget spent        ─► return Exhausted{attempts, last: err}
//!   │           ├─ delay = backoff.next(attempt)
//!   │           ├─ on_backoff(retry, delay, &err)
//!   │           └─ sleep(delay)        (races ctx.cancelled())
//!   └─► attempt += 1
//! }
//! ```
//!
//! ## Rules
//! - At most `max_retries + 1` invocations per run.
//! - Cancellation at any suspension point returns [`DispatchError::Canceled`] immediately.
//! - Intermediate failures never surface; only the final outcome is returned.

use std::future::Future;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, ExecutorError};
use crate::policies::BackoffPolicy;

/// Bounded retry with backoff for transient executor failures.
///
/// Stateless across runs: one `Copy` instance serves every task of a dispatcher.
///
/// # Example
/// ```rust
/// use dispatchvisor::{DispatchError, ExecutorError, RetryPolicy};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(3, Default::default());
/// let ctx = CancellationToken::new();
///
/// let res: Result<u32, DispatchError> = policy
///     .run(&ctx, |_attempt| async { Err(ExecutorError::authentication("bad key")) })
///     .await;
/// assert!(matches!(res, Err(DispatchError::Terminal(_))));
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the first one.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Three retries with the default `2^k s + 1 s` schedule.
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Runs `op` until it succeeds, fails terminally, exhausts the budget, or `ctx` ends.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, ctx: &CancellationToken, op: F) -> Result<T, DispatchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExecutorError>>,
    {
        self.run_with(ctx, op, |_, _, _| {}).await
    }

    /// Same as [`run`](Self::run), reporting each scheduled backoff to `on_backoff`.
    ///
    /// `on_backoff(retry, delay, err)` is called before sleeping, with `retry`
    /// being the 0-based index of the upcoming retry.
    pub async fn run_with<T, F, Fut, B>(
        &self,
        ctx: &CancellationToken,
        mut op: F,
        mut on_backoff: B,
    ) -> Result<T, DispatchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExecutorError>>,
        B: FnMut(u32, Duration, &ExecutorError),
    {
        let mut attempt: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(DispatchError::Canceled);
            }
            let res = select! {
                biased;
                _ = ctx.cancelled() => return Err(DispatchError::Canceled),
                res = op(attempt) => res,
            };

            let err = match res {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_transient() {
                return Err(DispatchError::Terminal(err));
            }
            if attempt >= self.max_retries {
                return Err(DispatchError::Exhausted {
                    attempts: attempt + 1,
                    last: err,
                });
            }

            let delay = self.backoff.next(attempt);
            on_backoff(attempt, delay, &err);

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                biased;
                _ = ctx.cancelled() => return Err(DispatchError::Canceled),
                _ = &mut sleep => {}
            }
            attempt += 1;
        }
    }
}
