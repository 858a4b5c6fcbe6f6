//! # Result delivery channels.
//!
//! - [`ResultReceiver`]: single-delivery future for one submitted task
//!   (backed by `tokio::sync::oneshot`).
//! - [`BatchStream`]: ordered stream of batch results (backed by `tokio::sync::mpsc`).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use crate::error::DispatchError;

/// Outcome of one task: a value or the single error that ended it.
pub type AsyncResult<T> = Result<T, DispatchError>;

/// Receives the single [`AsyncResult`] of a submitted task.
///
/// Await it to get the outcome. Dropping it does not cancel the task; cancel the
/// task's context for that.
#[must_use = "the result of a submitted task is delivered through this receiver"]
#[derive(Debug)]
pub struct ResultReceiver<T> {
    rx: oneshot::Receiver<AsyncResult<T>>,
}

impl<T> ResultReceiver<T> {
    pub(crate) fn new(rx: oneshot::Receiver<AsyncResult<T>>) -> Self {
        Self { rx }
    }

    /// Returns a receiver that is already resolved with `result`.
    pub(crate) fn ready(result: AsyncResult<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl<T> Future for ResultReceiver<T> {
    type Output = AsyncResult<T>;

    /// A worker that vanished without sending (runtime shutting down) reads as cancellation.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(DispatchError::Canceled)))
    }
}

/// Ordered stream of batch results.
///
/// Yields results at positions `0..M` in input order, then ends. Ends early if the
/// batch context is cancelled while streaming.
#[must_use = "batch results are delivered through this stream"]
#[derive(Debug)]
pub struct BatchStream<T> {
    rx: mpsc::Receiver<AsyncResult<T>>,
}

impl<T> BatchStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<AsyncResult<T>>) -> Self {
        Self { rx }
    }

    /// Receives the next result in input order, or `None` once the stream ends.
    pub async fn recv(&mut self) -> Option<AsyncResult<T>> {
        self.rx.recv().await
    }
}

impl<T> Stream for BatchStream<T> {
    type Item = AsyncResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
