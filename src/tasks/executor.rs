//! # Executor abstraction.
//!
//! An [`Executor`] performs **one** remote call (a prompt check, a conversation check,
//! ...) and returns either a typed output or an [`ExecutorError`] tagged with its
//! [`ErrorKind`](crate::ErrorKind). Retrying, slot management and cancellation
//! bookkeeping live in the dispatcher, not here.
//!
//! The executor receives a [`CancellationToken`]; a long call may observe it and
//! return early. If it does not, the dispatcher stops waiting for it anyway.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;

/// # One classification call against a remote service.
///
/// `execute` may be invoked several times for the same input (once per retry),
/// which is why the input is borrowed.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use dispatchvisor::{Executor, ExecutorError};
///
/// struct LengthCheck;
///
/// #[async_trait]
/// impl Executor for LengthCheck {
///     type Input = String;
///     type Output = bool;
///
///     fn name(&self) -> &str { "length-check" }
///
///     async fn execute(&self, _ctx: CancellationToken, input: &String) -> Result<bool, ExecutorError> {
///         if input.is_empty() {
///             return Err(ExecutorError::validation("empty content"));
///         }
///         Ok(input.len() < 4096)
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Request payload for one call.
    type Input: Send + Sync + 'static;
    /// Successful response of one call.
    type Output: Send + 'static;

    /// Returns a stable, human-readable name (used in events and logs).
    fn name(&self) -> &str;

    /// Performs one call.
    async fn execute(
        &self,
        ctx: CancellationToken,
        input: &Self::Input,
    ) -> Result<Self::Output, ExecutorError>;
}
