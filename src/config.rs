//! # Dispatcher configuration.
//!
//! Provides [`DispatcherConfig`] centralized settings passed to
//! [`Dispatcher::builder`](crate::Dispatcher::builder). Nothing is read from
//! process-wide state: pool size and retry budget are always explicit.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → [`DEFAULT_MAX_CONCURRENT`]
//! - `bus_capacity = 0` → clamped to 1

use crate::policies::{BackoffPolicy, RetryPolicy};

/// Pool size used when none (or zero) is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Retry budget used by [`DispatcherConfig::default`].
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
///
/// ## Field semantics
/// - `max_concurrent`: number of slots, i.e. executor calls in flight at once
/// - `max_retries`: additional attempts after a transient failure
/// - `backoff`: delay schedule between attempts
/// - `bus_capacity`: event bus ring buffer size
///
/// All fields are public; prefer the accessors to avoid sprinkling sentinel checks.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Maximum number of executor calls running at once.
    ///
    /// Shared by single submissions and batches alike.
    pub max_concurrent: usize,

    /// Additional attempts allowed for transient failures.
    pub max_retries: u32,

    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl DispatcherConfig {
    /// Returns the effective pool size (`0` means the default of 10).
    #[inline]
    pub fn concurrency(&self) -> usize {
        if self.max_concurrent == 0 {
            DEFAULT_MAX_CONCURRENT
        } else {
            self.max_concurrent
        }
    }

    /// Builds the retry policy shared by every task.
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy with the given pool size.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Returns a copy with the given retry budget.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }
}

impl Default for DispatcherConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 10`
    /// - `max_retries = 3`
    /// - `backoff = BackoffPolicy::default()` (`2^k s + 1 s`)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_falls_back_to_default() {
        let cfg = DispatcherConfig::default().with_max_concurrent(0);
        assert_eq!(cfg.concurrency(), DEFAULT_MAX_CONCURRENT);
        assert_eq!(cfg.with_max_concurrent(3).concurrency(), 3);
    }

    #[test]
    fn test_retry_policy_mirrors_fields() {
        let cfg = DispatcherConfig::default().with_max_retries(5);
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.backoff, cfg.backoff);
    }
}
