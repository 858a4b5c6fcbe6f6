//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] randomizes the exponential part of a backoff delay so that many
//! tasks rate-limited at the same moment do not retry in lockstep.
//!
//! - [`JitterPolicy::None`]: exact delays (default)
//! - [`JitterPolicy::Full`]: random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + random[0, delay/2]`

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in `[0, delay]`.
    Full,

    /// Equal jitter: `delay/2 + random[0, delay/2]`.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    let half = ms / 2;
    if half == 0 {
        return Duration::from_millis(ms);
    }
    Duration::from_millis(half + rand::rng().random_range(0..=half))
}
