//! # Example: batch_classify
//!
//! Demonstrates a moderation-style [`Executor`] dispatched through
//! [`AsyncClient`]: a batch of texts is classified with at most 3 calls in flight,
//! a flaky upstream is retried with backoff, and the results come back in input
//! order even though the calls finish out of order.
//!
//! ## Flow
//! ```text
//! submit_batch(texts)
//!   ├─► Worker per text ─► slot (3 max) ─► Moderation::execute()
//!   │       ├─ "" ─► Validation error (terminal, no retry)
//!   │       ├─ first call for "retry me" ─► RateLimited ─► BackoffScheduled ─► retry
//!   │       └─ otherwise ─► Ok(Verdict)
//!   ├─► batch collector reorders by input index
//!   └─► close() waits for every worker, then releases the pool
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example batch_classify
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dispatchvisor::{
    AsyncClient, BackoffPolicy, Dispatcher, DispatcherConfig, Executor, ExecutorError, LogWriter,
    Subscribe,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Verdict {
    flagged: bool,
    score: f32,
}

/// Fake moderation endpoint.
struct Moderation {
    limited_once: AtomicBool,
}

#[async_trait]
impl Executor for Moderation {
    type Input = String;
    type Output = Verdict;

    fn name(&self) -> &str {
        "moderation"
    }

    async fn execute(&self, ctx: CancellationToken, text: &String) -> Result<Verdict, ExecutorError> {
        if text.is_empty() {
            return Err(ExecutorError::validation("content must not be empty"));
        }
        if text == "retry me" && !self.limited_once.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::rate_limited("429 Too Many Requests"));
        }

        // Longer texts take longer, so completion order differs from input order.
        let latency = Duration::from_millis(40 * text.len() as u64);
        tokio::select! {
            _ = ctx.cancelled() => Err(ExecutorError::network("request aborted")),
            _ = tokio::time::sleep(latency) => {
                let score = if text.contains("spam") { 0.97 } else { 0.03 };
                Ok(Verdict { flagged: score > 0.5, score })
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = DispatcherConfig {
        max_concurrent: 3,
        max_retries: 2,
        backoff: BackoffPolicy {
            first: Duration::from_millis(100),
            offset: Duration::from_millis(50),
            ..BackoffPolicy::default()
        },
        ..DispatcherConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let dispatcher = Arc::new(Dispatcher::builder(cfg).with_subscribers(subs).build());

    let client = AsyncClient::with_dispatcher(
        Arc::new(Moderation {
            limited_once: AtomicBool::new(false),
        }),
        dispatcher,
    );

    let texts = vec![
        "a rather long and perfectly harmless sentence".to_string(),
        "buy spam now".to_string(),
        String::new(),
        "retry me".to_string(),
        "ok".to_string(),
    ];

    let ctx = CancellationToken::new();
    let mut results = client.submit_batch(&ctx, texts.clone());
    let mut index = 0;
    while let Some(res) = results.recv().await {
        match res {
            Ok(v) => println!("[{index}] {:?} -> flagged={} score={:.2}", texts[index], v.flagged, v.score),
            Err(e) => println!("[{index}] {:?} -> error: {e} ({})", texts[index], e.as_label()),
        }
        index += 1;
    }

    client.close().await;
    println!("closed, in_flight={}", client.in_flight());
}
