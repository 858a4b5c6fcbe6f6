//! # dispatchvisor
//!
//! **Dispatchvisor** is a bounded-concurrency async dispatcher for remote calls
//! (classification, moderation, scoring) that fail in well-known ways.
//!
//! It admits tasks through a fixed pool of slots, retries transient failures
//! with exponential backoff, streams batch results back in input order, and
//! shuts down by draining everything it has accepted.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   AsyncClient<E>          AsyncClient<F>          (callers: submit / submit_batch)
//!        └──────────┬──────────────┘
//!                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - Lifecycle (Open / Closing / Closed, outstanding-task tracker)  │
//! │  - Semaphore (K slots, shared by single and batch submissions)    │
//! │  - RetryPolicy (max_retries + BackoffPolicy)                      │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────┐       ┌──────────┐       ┌──────────┐
//!     │  Worker  │       │  Worker  │       │  Worker  │   one per task
//!     │ slot ─►  │       │ slot ─►  │       │ slot ─►  │
//!     │ retry ─► │       │ retry ─► │       │ retry ─► │
//!     │ release  │       │ release  │       │ release  │
//!     └────┬─────┘       └────┬─────┘       └────┬─────┘
//!          ▼                  ▼                  ▼
//!   ResultReceiver     ResultReceiver ──► batch collector ──► BatchStream (input order)
//!
//!   Dispatcher + Workers ──► Bus ──► SubscriberSet ──► Subscribe::on_event()
//! ```
//!
//! ### Task lifecycle
//! ```text
//! submit(task)
//!   ├─ dispatcher closing/closed ─► Err(Closed)   (no slot, executor untouched)
//!   └─ admitted:
//!        ├─► wait for a slot            (ctx cancelled ─► Err(Canceled))
//!        ├─► loop {
//!        │     execute(ctx, &input)
//!        │       ├─ Ok(v)                ─► Ok(v)
//!        │       ├─ Err(terminal)        ─► Err(Terminal)
//!        │       └─ Err(transient):
//!        │            ├─ retries spent   ─► Err(Exhausted { attempts, last })
//!        │            └─ sleep 2^k s + 1 s (ctx cancelled ─► Err(Canceled))
//!        │   }
//!        └─► release slot, deliver exactly one result
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                           |
//! |-------------------|-----------------------------------------------------------------|----------------------------------------------|
//! | **Dispatch**      | Bounded admission, ordered batches, drained shutdown.           | [`Dispatcher`], [`AsyncClient`]              |
//! | **Executors**     | The remote call being dispatched, as a trait or a closure.      | [`Executor`], [`ExecutorFn`], [`Task`]       |
//! | **Policies**      | Retry budget and backoff schedule.                              | [`RetryPolicy`], [`BackoffPolicy`]           |
//! | **Errors**        | Classified executor errors and dispatch outcomes.               | [`ExecutorError`], [`DispatchError`]         |
//! | **Results**       | Single-delivery receivers and ordered batch streams.            | [`ResultReceiver`], [`BatchStream`]          |
//! | **Subscriber API**| Observe dispatcher events (logging, metrics, custom sinks).     | [`Subscribe`], [`Event`]                     |
//! | **Configuration** | Pool size, retries, backoff, bus capacity.                      | [`DispatcherConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports a built-in [`LogWriter`] subscriber that writes
//!   events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//! use dispatchvisor::{AsyncClient, DispatcherConfig, ExecutorError, ExecutorFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn dispatchvisor::Subscribe>> =
//!         vec![Arc::new(dispatchvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn dispatchvisor::Subscribe>> = Vec::new();
//!
//!     let dispatcher = Arc::new(
//!         dispatchvisor::Dispatcher::builder(DispatcherConfig::default())
//!             .with_subscribers(subs)
//!             .build(),
//!     );
//!
//!     let check = ExecutorFn::arc("check", |_ctx: CancellationToken, text: String| async move {
//!         if text.is_empty() {
//!             return Err(ExecutorError::validation("empty content"));
//!         }
//!         Ok(text.contains("spam"))
//!     });
//!     let client = AsyncClient::with_dispatcher(check, dispatcher);
//!
//!     let ctx = CancellationToken::new();
//!     let inputs = vec!["hello".to_string(), "buy spam".to_string(), String::new()];
//!     let results: Vec<_> = client.submit_batch(&ctx, inputs).collect().await;
//!
//!     assert_eq!(results[0], Ok(false));
//!     assert_eq!(results[1], Ok(true));
//!     assert!(results[2].is_err());
//!
//!     client.close().await;
//! }
//! ```
mod client;
mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use client::AsyncClient;
pub use config::{DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RETRIES, DispatcherConfig};
pub use crate::core::{
    AsyncResult, BatchStream, Dispatcher, DispatcherBuilder, DispatcherState, ResultReceiver,
};
pub use error::{DispatchError, ErrorKind, ExecutorError};
pub use events::{Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Executor, ExecutorFn, Task};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
