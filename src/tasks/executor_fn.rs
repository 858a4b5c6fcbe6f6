//! # Function-backed executor (`ExecutorFn`)
//!
//! [`ExecutorFn`] wraps a closure `F: Fn(CancellationToken, I) -> Fut`, producing a
//! fresh future per call. The input is cloned for every attempt, so retries never
//! observe state left behind by an earlier attempt.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use dispatchvisor::{Executor, ExecutorError, ExecutorFn};
//!
//! let upper = ExecutorFn::arc("upper", |_ctx: CancellationToken, text: String| async move {
//!     Ok::<_, ExecutorError>(text.to_uppercase())
//! });
//!
//! assert_eq!(upper.name(), "upper");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;
use crate::tasks::executor::Executor;

/// Function-backed executor implementation.
pub struct ExecutorFn<I, O, F> {
    name: Cow<'static, str>,
    f: F,
    _io: PhantomData<fn(I) -> O>,
}

impl<I, O, F> ExecutorFn<I, O, F> {
    /// Creates a new function-backed executor.
    ///
    /// Prefer [`ExecutorFn::arc`] when the executor goes straight into a client.
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(CancellationToken, I) -> Fut,
        Fut: Future<Output = Result<O, ExecutorError>>,
    {
        Self {
            name: name.into(),
            f,
            _io: PhantomData,
        }
    }

    /// Creates the executor and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(CancellationToken, I) -> Fut,
        Fut: Future<Output = Result<O, ExecutorError>>,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<I, O, F, Fut> Executor for ExecutorFn<I, O, F>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(CancellationToken, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ExecutorError>> + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: CancellationToken, input: &I) -> Result<O, ExecutorError> {
        (self.f)(ctx, input.clone()).await
    }
}
