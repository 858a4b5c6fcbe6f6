//! # AsyncClient: one executor bound to a dispatcher.
//!
//! [`AsyncClient`] is the caller-facing surface. It pairs an [`Executor`] with a
//! [`Dispatcher`], so callers submit plain inputs instead of building [`Task`]s.
//!
//! Several clients may share one dispatcher and therefore one slot pool:
//!
//! ```text
//!   AsyncClient<PromptCheck> ──┐
//!                              ├──► Arc<Dispatcher> (K slots, one retry policy)
//!   AsyncClient<ConvCheck>  ───┘
//! ```
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use dispatchvisor::{AsyncClient, DispatcherConfig, ExecutorError, ExecutorFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let exec = ExecutorFn::arc("len", |_ctx: CancellationToken, s: String| async move {
//!         Ok::<_, ExecutorError>(s.len())
//!     });
//!     let client = AsyncClient::new(exec, DispatcherConfig::default());
//!     let ctx = CancellationToken::new();
//!
//!     assert_eq!(client.submit(&ctx, "hello".to_string()).await, Ok(5));
//!     client.close().await;
//! }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::DispatcherConfig,
    core::{BatchStream, Dispatcher, ResultReceiver},
    tasks::{Executor, Task},
};

/// Submits inputs for one executor through a (possibly shared) dispatcher.
pub struct AsyncClient<E: Executor> {
    dispatcher: Arc<Dispatcher>,
    executor: Arc<E>,
}

impl<E: Executor> Clone for AsyncClient<E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: Executor> AsyncClient<E> {
    /// Creates a client with its own dispatcher.
    pub fn new(executor: Arc<E>, cfg: DispatcherConfig) -> Self {
        Self::with_dispatcher(executor, Arc::new(Dispatcher::builder(cfg).build()))
    }

    /// Creates a client on an existing dispatcher, sharing its slot pool.
    pub fn with_dispatcher(executor: Arc<E>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            executor,
        }
    }

    /// Submits one input. See [`Dispatcher::submit`].
    pub fn submit(&self, ctx: &CancellationToken, input: E::Input) -> ResultReceiver<E::Output> {
        self.dispatcher
            .submit(Task::new(Arc::clone(&self.executor), input, ctx.clone()))
    }

    /// Submits one input that never takes a slot. See
    /// [`Dispatcher::submit_unslotted`].
    pub fn submit_unslotted(
        &self,
        ctx: &CancellationToken,
        input: E::Input,
    ) -> ResultReceiver<E::Output> {
        self.dispatcher
            .submit_unslotted(Task::new(Arc::clone(&self.executor), input, ctx.clone()))
    }

    /// Submits many inputs and streams results in input order. See
    /// [`Dispatcher::submit_batch`].
    pub fn submit_batch<I>(&self, ctx: &CancellationToken, inputs: I) -> BatchStream<E::Output>
    where
        I: IntoIterator<Item = E::Input>,
    {
        self.dispatcher
            .submit_batch(ctx, Arc::clone(&self.executor), inputs)
    }

    pub fn capacity(&self) -> usize {
        self.dispatcher.capacity()
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn busy_slots(&self) -> usize {
        self.dispatcher.busy_slots()
    }

    /// Closes the underlying dispatcher, affecting every client that shares it.
    pub async fn close(&self) {
        self.dispatcher.close().await;
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }
}
