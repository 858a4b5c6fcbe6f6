//! # Ordered batch collection.
//!
//! Fans many result receivers in, places every result at its input index, and
//! streams the finished slice out in order.
//!
//! ```text
//! receivers[0..M) ──► FuturesUnordered (completion order, arbitrary)
//!                          │ (index, result)
//!                          ▼
//!                 slots[index] = Some(result)      (preallocated, never appended)
//!                          │ after all M arrived
//!                          ▼
//!          for result in slots: send  (races ctx.cancelled(), stops if it wins)
//! ```

use futures::{StreamExt, stream::FuturesUnordered};
use tokio::{runtime::Handle, select, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::core::result::{AsyncResult, BatchStream, ResultReceiver};

/// Collects `receivers` and streams their results in input order.
///
/// An empty input yields a stream that ends immediately.
pub(crate) fn collect_ordered<T: Send + 'static>(
    handle: &Handle,
    ctx: CancellationToken,
    receivers: Vec<ResultReceiver<T>>,
) -> BatchStream<T> {
    let (tx, rx) = mpsc::channel(1);
    if receivers.is_empty() {
        return BatchStream::new(rx);
    }

    handle.spawn(async move {
        let mut slots: Vec<Option<AsyncResult<T>>> = Vec::with_capacity(receivers.len());
        slots.resize_with(receivers.len(), || None);

        let mut pending: FuturesUnordered<_> = receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| async move { (index, rx.await) })
            .collect();
        while let Some((index, res)) = pending.next().await {
            slots[index] = Some(res);
        }

        for res in slots.into_iter().flatten() {
            select! {
                biased;
                _ = ctx.cancelled() => return,
                sent = tx.send(res) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    });

    BatchStream::new(rx)
}

/// Streams already-known results in the given order.
pub(crate) fn ready_stream<T>(results: Vec<AsyncResult<T>>) -> BatchStream<T> {
    let (tx, rx) = mpsc::channel(results.len().max(1));
    for res in results {
        let _ = tx.try_send(res);
    }
    BatchStream::new(rx)
}
