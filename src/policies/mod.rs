//! Retry and backoff policies.
//!
//! This module groups the knobs that control **whether** a failed executor call is
//! retried and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]   bounded retry of transient failures (max_retries + backoff)
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max / offset + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! DispatcherConfig { max_retries, backoff }
//!      └─► RetryPolicy (one Copy instance per dispatcher)
//!           └─► core::worker uses run_with() around every executor call
//! ```
//!
//! ## Defaults
//! - `max_retries = 3`.
//! - `BackoffPolicy::default()` → `2^k s + 1 s`, uncapped, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
