//! # Executor abstractions and submitted tasks.
//!
//! This module provides:
//! - [`Executor`] - trait for one async, cancelable remote call
//! - [`ExecutorFn`] - closure-backed executor
//! - [`Task`] - an executor, its input and a cancellation context

mod executor;
mod executor_fn;
mod task;

pub use executor::Executor;
pub use executor_fn::ExecutorFn;
pub use task::Task;
