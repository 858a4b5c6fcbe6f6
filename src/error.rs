//! Error types used by the dispatcher and by executors.
//!
//! This module defines three types:
//!
//! - [`ErrorKind`]: classification tag attached to every executor failure.
//! - [`ExecutorError`]: the error an [`Executor`](crate::Executor) returns for one call.
//! - [`DispatchError`]: the final outcome of a submitted task that did not succeed.
//!
//! Retry decisions are made on [`ErrorKind`] alone, so the retry loop never has to
//! know about transport status codes.

use std::fmt;

use thiserror::Error;

/// Classification of a single executor failure.
///
/// Terminal kinds are returned to the caller at once; transient kinds are retried
/// by [`RetryPolicy`](crate::RetryPolicy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials were rejected (terminal).
    Authentication,
    /// The request itself is invalid (terminal).
    Validation,
    /// Connection or transport failure (transient).
    Network,
    /// The remote service asked us to slow down (transient).
    RateLimited,
    /// The remote service failed internally (transient).
    Server,
}

impl ErrorKind {
    /// Returns `true` for kinds that are worth retrying.
    ///
    /// # Example
    /// ```
    /// use dispatchvisor::ErrorKind;
    ///
    /// assert!(ErrorKind::RateLimited.is_transient());
    /// assert!(!ErrorKind::Authentication.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::RateLimited | ErrorKind::Server
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # Error returned by one executor call.
///
/// Carries an explicit [`ErrorKind`] plus a human-readable message.
///
/// # Example
/// ```
/// use dispatchvisor::{ErrorKind, ExecutorError};
///
/// let err = ExecutorError::rate_limited("429 from upstream");
/// assert_eq!(err.kind(), ErrorKind::RateLimited);
/// assert_eq!(err.to_string(), "rate_limited: 429 from upstream");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ExecutorError {
    kind: ErrorKind,
    message: String,
}

impl ExecutorError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    /// Returns the classification tag.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Shorthand for `self.kind().is_transient()`.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// # Final outcome of a task that did not produce a value.
///
/// Every submitted task resolves with exactly one `Ok(value)` or one of these.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The task's context was cancelled before it completed.
    #[error("context cancelled")]
    Canceled,

    /// The task was submitted after the dispatcher started closing.
    #[error("dispatcher is closed")]
    Closed,

    /// The executor failed with a terminal error; no retry was attempted.
    #[error("terminal error (no retry): {0}")]
    Terminal(ExecutorError),

    /// The executor kept failing with transient errors until the retry budget ran out.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Total number of executor invocations.
        attempts: u32,
        /// The last transient error, returned verbatim.
        last: ExecutorError,
    },

    /// The task was submitted outside a Tokio runtime and never admitted.
    #[error("no tokio runtime to run the task on")]
    NoRuntime,

    /// The executor panicked; the slot was released and the panic contained.
    #[error("executor panicked: {reason}")]
    Panicked {
        /// Panic payload, if it was a string.
        reason: String,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use dispatchvisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::Closed.as_label(), "dispatch_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Canceled => "dispatch_canceled",
            DispatchError::Closed => "dispatch_closed",
            DispatchError::Terminal(_) => "dispatch_terminal",
            DispatchError::Exhausted { .. } => "dispatch_exhausted",
            DispatchError::NoRuntime => "dispatch_no_runtime",
            DispatchError::Panicked { .. } => "dispatch_panicked",
        }
    }

    /// Returns the executor error kind behind this outcome, if any.
    ///
    /// For [`DispatchError::Exhausted`] this is the kind of the last attempt, which
    /// lets callers tell "rate limited" apart from "network retries exhausted".
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DispatchError::Terminal(e) => Some(e.kind()),
            DispatchError::Exhausted { last, .. } => Some(last.kind()),
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, DispatchError::Canceled)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DispatchError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let transient = [ErrorKind::Network, ErrorKind::RateLimited, ErrorKind::Server];
        let terminal = [ErrorKind::Authentication, ErrorKind::Validation];

        assert!(transient.iter().all(ErrorKind::is_transient));
        assert!(!terminal.iter().any(ErrorKind::is_transient));
    }

    #[test]
    fn test_exhausted_exposes_last_kind() {
        let err = DispatchError::Exhausted {
            attempts: 4,
            last: ExecutorError::rate_limited("slow down"),
        };
        assert_eq!(err.kind(), Some(ErrorKind::RateLimited));
        assert_eq!(
            err.to_string(),
            "retries exhausted after 4 attempts: rate_limited: slow down"
        );
    }

    #[test]
    fn test_kind_absent_for_lifecycle_errors() {
        assert_eq!(DispatchError::Canceled.kind(), None);
        assert_eq!(DispatchError::Closed.kind(), None);
        assert_eq!(DispatchError::NoRuntime.kind(), None);
        assert_eq!(DispatchError::NoRuntime.as_label(), "dispatch_no_runtime");
        assert!(DispatchError::Canceled.is_canceled());
        assert!(DispatchError::Closed.is_closed());
    }
}
