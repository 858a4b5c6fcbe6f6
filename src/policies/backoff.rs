//! # Backoff policy for retrying executor calls.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated transient failures.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the base delay of the first retry;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] an optional cap on the exponential part (uncapped by default);
//! - [`BackoffPolicy::offset`] a fixed baseline added to every delay.
//!
//! The delay before retry `k` (0-indexed) is `min(first × factor^k, max)`, jittered,
//! plus `offset`. The base is derived purely from `k`, so jitter output never feeds
//! back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use dispatchvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//!
//! // 2^k seconds + 1 second
//! assert_eq!(backoff.next(0), Duration::from_secs(2));
//! assert_eq!(backoff.next(1), Duration::from_secs(3));
//! assert_eq!(backoff.next(2), Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay before the first retry (before `offset` is added).
    pub first: Duration,
    /// Cap for the exponential part of the delay. `Duration::MAX` leaves it uncapped.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Fixed baseline added after jitter.
    pub offset: Duration,
    /// Jitter policy applied to the exponential part.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 1s`, `factor = 2.0`, `offset = 1s` (delays 2s, 3s, 5s, 9s, ...);
    /// - `max = Duration::MAX` (no cap);
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::MAX,
            factor: 2.0,
            offset: Duration::from_secs(1),
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before retry number `retry` (0-indexed).
    ///
    /// # Notes
    /// - Non-finite or negative intermediate values clamp to [`BackoffPolicy::max`].
    /// - `offset` is never jittered and never clamped.
    pub fn next(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = retry.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::try_from_secs_f64(unclamped_secs).unwrap_or(self.max)
            };

        self.jitter.apply(base).saturating_add(self.offset)
    }
}
