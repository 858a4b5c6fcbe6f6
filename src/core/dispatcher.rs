//! # Dispatcher: bounded admission, ordered batches, drained shutdown.
//!
//! The [`Dispatcher`] owns the slot pool (a counting semaphore), the lifecycle gate,
//! the shared [`RetryPolicy`] and the event [`Bus`]. Every submission, single or
//! batch, goes through the same gate and the same pool.
//!
//! ## Architecture
//! ```text
//! submit(task) ──► Handle::try_current()  (none ─► ready(Err(NoRuntime)))
//!              ──► Lifecycle::admit()
//!                     ├─ closed ─► ResultReceiver::ready(Err(Closed))      (no slot, no executor)
//!                     └─ token  ─► handle.spawn {
//!                                     res = Worker::run()     (slot ─► retry ─► release)
//!                                     tx.send(res)            (exactly once)
//!                                     drop(token)             (outstanding -= 1)
//!                                  }
//!
//! submit_unslotted(task) ──► same gate and drain, Worker skips the slot
//!
//! submit_batch(ctx, executor, inputs) ──► submit() per input ──► batch::collect_ordered()
//!
//! close() ──► Lifecycle::begin_close()  (Open ─► Closing, once)
//!             └─► drain (outstanding == 0) ─► semaphore.close() ─► Closed
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use dispatchvisor::{Dispatcher, DispatcherConfig, ExecutorError, ExecutorFn, Task};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let dispatcher = Dispatcher::builder(DispatcherConfig::default()).build();
//!     let double = ExecutorFn::arc("double", |_ctx: CancellationToken, n: u32| async move {
//!         Ok::<_, ExecutorError>(n * 2)
//!     });
//!
//!     let ctx = CancellationToken::new();
//!     let res = dispatcher.submit(Task::new(double.clone(), 21, ctx.clone())).await;
//!     assert_eq!(res, Ok(42));
//!
//!     dispatcher.close().await;
//!     let res = dispatcher.submit(Task::new(double, 1, ctx)).await;
//!     assert!(res.unwrap_err().is_closed());
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    config::DispatcherConfig,
    core::{
        batch::{collect_ordered, ready_stream},
        builder::DispatcherBuilder,
        lifecycle::{DispatcherState, Lifecycle},
        result::{BatchStream, ResultReceiver},
        worker::Worker,
    },
    error::DispatchError,
    events::{Bus, Event, EventKind},
    policies::RetryPolicy,
    tasks::{Executor, Task},
};

/// Admits tasks, enforces the concurrency cap, and drains on close.
pub struct Dispatcher {
    capacity: usize,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    lifecycle: Lifecycle,
    bus: Bus,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Returns a builder for a dispatcher with the given configuration.
    pub fn builder(cfg: DispatcherConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: &DispatcherConfig, bus: Bus) -> Self {
        let capacity = cfg.concurrency();
        Self {
            capacity,
            retry: cfg.retry_policy(),
            semaphore: Arc::new(Semaphore::new(capacity)),
            lifecycle: Lifecycle::new(),
            bus,
            next_id: AtomicU64::new(1),
        }
    }

    /// Submits one task and returns its result receiver immediately.
    ///
    /// If the dispatcher is closing or closed, the receiver resolves to
    /// [`DispatchError::Closed`] without the task ever contending for a slot.
    /// Called outside a Tokio runtime, it resolves to [`DispatchError::NoRuntime`].
    pub fn submit<E: Executor>(&self, task: Task<E>) -> ResultReceiver<E::Output> {
        self.dispatch(task, true)
    }

    /// Submits one task that never takes a slot.
    ///
    /// Meant for lightweight calls (health checks, metadata lookups) that must
    /// not queue behind classification work. The task is still refused once
    /// closing begins, retried by the shared policy, cancellable through its
    /// context, and waited for by [`close`](Self::close).
    pub fn submit_unslotted<E: Executor>(&self, task: Task<E>) -> ResultReceiver<E::Output> {
        self.dispatch(task, false)
    }

    /// Submits one task per input and streams the results in input order.
    ///
    /// Every item contends for the same slot pool as single submissions and is
    /// counted by [`close`](Self::close) like any other task. Cancelling `ctx`
    /// cancels all items and stops the stream.
    pub fn submit_batch<E, I>(
        &self,
        ctx: &CancellationToken,
        executor: Arc<E>,
        inputs: I,
    ) -> BatchStream<E::Output>
    where
        E: Executor,
        I: IntoIterator<Item = E::Input>,
    {
        let Ok(handle) = Handle::try_current() else {
            let results = inputs
                .into_iter()
                .map(|_| {
                    let id = self.next_id();
                    Err(self.reject(id, executor.name(), DispatchError::NoRuntime))
                })
                .collect();
            return ready_stream(results);
        };

        let receivers: Vec<_> = inputs
            .into_iter()
            .map(|input| self.submit(Task::new(Arc::clone(&executor), input, ctx.clone())))
            .collect();
        collect_ordered(&handle, ctx.clone(), receivers)
    }

    fn dispatch<E: Executor>(&self, task: Task<E>, slotted: bool) -> ResultReceiver<E::Output> {
        let id = self.next_id();

        let Ok(handle) = Handle::try_current() else {
            let err = self.reject(id, task.name(), DispatchError::NoRuntime);
            return ResultReceiver::ready(Err(err));
        };
        let Some(token) = self.lifecycle.admit() else {
            let err = self.reject(id, task.name(), DispatchError::Closed);
            return ResultReceiver::ready(Err(err));
        };
        self.bus.publish(
            Event::new(EventKind::TaskSubmitted)
                .with_task_id(id)
                .with_task(task.name()),
        );

        let (tx, rx) = oneshot::channel();
        let semaphore = slotted.then(|| Arc::clone(&self.semaphore));
        let worker = Worker::new(id, task, semaphore, self.retry, self.bus.clone());
        handle.spawn(async move {
            let res = worker.run().await;
            let _ = tx.send(res);
            drop(token);
        });

        ResultReceiver::new(rx)
    }

    /// Publishes `TaskRejected` and hands `err` back for delivery.
    fn reject(&self, id: u64, name: &str, err: DispatchError) -> DispatchError {
        self.bus.publish(
            Event::new(EventKind::TaskRejected)
                .with_task_id(id)
                .with_task(name)
                .with_reason(err.to_string()),
        );
        err
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Configured pool size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks admitted but not yet delivered (waiting for a slot, running, or backing off).
    pub fn in_flight(&self) -> usize {
        self.lifecycle.outstanding()
    }

    /// Slots currently held by workers.
    pub fn busy_slots(&self) -> usize {
        if self.semaphore.is_closed() {
            return 0;
        }
        self.capacity - self.semaphore.available_permits()
    }

    /// The retry policy applied to every task.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn state(&self) -> DispatcherState {
        self.lifecycle.state()
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state() != DispatcherState::Open
    }

    /// Stops admitting tasks, waits for every admitted task to deliver, then
    /// releases the slot pool.
    ///
    /// Idempotent: a call that finds the dispatcher already closing or closed
    /// returns at once. Never fails.
    pub async fn close(&self) {
        if !self.lifecycle.begin_close() {
            return;
        }
        self.bus.publish(Event::new(EventKind::CloseRequested).with_in_flight(self.in_flight()));

        self.lifecycle.drain().await;
        self.semaphore.close();
        self.lifecycle.finish();

        self.bus.publish(Event::new(EventKind::Drained));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ExecutorError};
    use crate::tasks::ExecutorFn;
    use futures::StreamExt;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout};

    fn dispatcher(max_concurrent: usize, max_retries: u32) -> Dispatcher {
        let cfg = DispatcherConfig::default()
            .with_max_concurrent(max_concurrent)
            .with_max_retries(max_retries);
        Dispatcher::builder(cfg).build()
    }

    /// Waits (real time) until `cond` holds.
    async fn eventually(mut cond: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !cond() {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// Executor that counts calls and blocks until the gate opens.
    struct Gated {
        calls: Arc<AtomicUsize>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        gate: watch::Sender<bool>,
    }

    impl Gated {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                running: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                gate: watch::channel(false).0,
            }
        }

        fn open(&self) {
            self.gate.send_replace(true);
        }

        fn executor(&self) -> Arc<impl Executor<Input = u32, Output = u32>> {
            let calls = Arc::clone(&self.calls);
            let running = Arc::clone(&self.running);
            let peak = Arc::clone(&self.peak);
            let gate = self.gate.subscribe();

            ExecutorFn::arc("gated", move |_ctx: CancellationToken, n: u32| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let mut gate = gate.clone();
                calls.fetch_add(1, Ordering::SeqCst);

                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let _ = gate.wait_for(|open| *open).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ExecutorError>(n)
                }
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_capacity() {
        let d = dispatcher(3, 0);
        let gated = Gated::new();
        let exec = gated.executor();
        let ctx = CancellationToken::new();

        let receivers: Vec<_> = (0..10)
            .map(|n| d.submit(Task::new(exec.clone(), n, ctx.clone())))
            .collect();

        eventually(|| gated.running.load(Ordering::SeqCst) == 3).await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(gated.peak.load(Ordering::SeqCst), 3);
        assert_eq!(d.busy_slots(), 3);
        assert_eq!(d.in_flight(), 10);

        gated.open();
        for (n, rx) in receivers.into_iter().enumerate() {
            assert_eq!(rx.await, Ok(n as u32));
        }
        assert_eq!(gated.peak.load(Ordering::SeqCst), 3);
        assert_eq!(gated.calls.load(Ordering::SeqCst), 10);
        eventually(|| d.in_flight() == 0).await;
    }

    #[tokio::test]
    async fn test_cancel_before_slot_skips_executor() {
        let d = dispatcher(1, 0);
        let gated = Gated::new();
        let exec = gated.executor();

        let holder = d.submit(Task::new(exec.clone(), 1, CancellationToken::new()));
        eventually(|| gated.running.load(Ordering::SeqCst) == 1).await;

        let ctx = CancellationToken::new();
        let waiting = d.submit(Task::new(exec.clone(), 2, ctx.clone()));
        sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        assert_eq!(waiting.await, Err(DispatchError::Canceled));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);

        gated.open();
        assert_eq!(holder.await, Ok(1));
        assert_eq!(d.busy_slots(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_context_never_runs() {
        let d = dispatcher(4, 0);
        let gated = Gated::new();
        gated.open();

        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = d.submit(Task::new(gated.executor(), 1, ctx)).await;

        assert_eq!(res, Err(DispatchError::Canceled));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_after_close_is_rejected_without_slot() {
        let d = dispatcher(2, 0);
        let gated = Gated::new();
        gated.open();

        d.close().await;
        assert_eq!(d.state(), DispatcherState::Closed);

        let res = d
            .submit(Task::new(gated.executor(), 1, CancellationToken::new()))
            .await;
        assert_eq!(res, Err(DispatchError::Closed));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
        assert_eq!(d.busy_slots(), 0);
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_executor_is_retried_then_reported() {
        let d = dispatcher(2, 3);
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stamps);
        let exec = ExecutorFn::arc("limited", move |_ctx: CancellationToken, _n: u32| {
            seen.lock().unwrap().push(tokio::time::Instant::now());
            async { Err::<u32, _>(ExecutorError::rate_limited("429")) }
        });

        let res = d.submit(Task::new(exec, 0, CancellationToken::new())).await;
        assert_eq!(res.as_ref().unwrap_err().kind(), Some(ErrorKind::RateLimited));
        assert!(matches!(res, Err(DispatchError::Exhausted { attempts: 4, .. })));

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<u64> = stamps
            .windows(2)
            .map(|w| (w[1] - w[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn test_terminal_error_is_delivered_once() {
        let d = dispatcher(2, 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let exec = ExecutorFn::arc("auth", move |_ctx: CancellationToken, _n: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(ExecutorError::authentication("invalid API key")) }
        });

        let res = d.submit(Task::new(exec, 0, CancellationToken::new())).await;
        assert_eq!(
            res,
            Err(DispatchError::Terminal(ExecutorError::authentication(
                "invalid API key"
            )))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_executor_releases_slot() {
        let d = dispatcher(1, 0);
        let exec = ExecutorFn::arc("panics", |_ctx: CancellationToken, n: u32| async move {
            if n == 0 {
                panic!("executor blew up");
            }
            Ok::<_, ExecutorError>(n)
        });

        let res = d.submit(Task::new(exec.clone(), 0, CancellationToken::new())).await;
        assert_eq!(
            res,
            Err(DispatchError::Panicked {
                reason: "executor blew up".into()
            })
        );

        let res = d.submit(Task::new(exec, 5, CancellationToken::new())).await;
        assert_eq!(res, Ok(5));
        assert_eq!(d.busy_slots(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_close_waits_once() {
        let d = Arc::new(dispatcher(2, 0));
        let gated = Gated::new();
        let pending = d.submit(Task::new(gated.executor(), 7, CancellationToken::new()));
        eventually(|| gated.running.load(Ordering::SeqCst) == 1).await;

        let first = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.close().await }
        });
        let second = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.close().await }
        });

        sleep(Duration::from_millis(20)).await;
        assert!(
            first.is_finished() ^ second.is_finished(),
            "exactly one close() call should be waiting on the drain"
        );
        assert_eq!(d.state(), DispatcherState::Closing);

        gated.open();
        assert_eq!(pending.await, Ok(7));
        timeout(Duration::from_secs(1), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await
        .expect("both close() calls return");
        assert_eq!(d.state(), DispatcherState::Closed);
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_close_waits_for_batch_workers() {
        let d = Arc::new(dispatcher(2, 0));
        let gated = Gated::new();
        let ctx = CancellationToken::new();
        let mut stream = d.submit_batch(&ctx, gated.executor(), vec![1, 2, 3]);
        eventually(|| gated.running.load(Ordering::SeqCst) == 2).await;
        assert_eq!(d.in_flight(), 3);

        let closing = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.close().await }
        });
        sleep(Duration::from_millis(20)).await;
        assert!(!closing.is_finished(), "close() must wait for batch items");

        gated.open();
        timeout(Duration::from_secs(1), closing)
            .await
            .expect("close() returns after the drain")
            .unwrap();
        assert_eq!(d.in_flight(), 0);

        let mut got = Vec::new();
        while let Some(res) = stream.recv().await {
            got.push(res);
        }
        assert_eq!(got, vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_preserves_input_order() {
        let d = dispatcher(8, 0);
        let finished = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&finished);
        let exec = ExecutorFn::arc("reverse", move |_ctx: CancellationToken, n: u64| {
            let log = Arc::clone(&log);
            async move {
                sleep(Duration::from_millis(100 * (8 - n))).await;
                log.lock().unwrap().push(n);
                Ok::<_, ExecutorError>(n * 10)
            }
        });

        let ctx = CancellationToken::new();
        let results: Vec<_> = d.submit_batch(&ctx, exec, 0..8u64).collect().await;

        assert_eq!(*finished.lock().unwrap(), (0..8u64).rev().collect::<Vec<_>>());
        let expected: Vec<_> = (0..8u64).map(|n| Ok(n * 10)).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_empty_batch_ends_immediately() {
        let d = dispatcher(2, 0);
        let gated = Gated::new();
        let mut stream = d.submit_batch(&CancellationToken::new(), gated.executor(), Vec::new());
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_batch_on_closed_dispatcher_yields_closed_per_item() {
        let d = dispatcher(2, 0);
        d.close().await;
        let gated = Gated::new();

        let results: Vec<_> = d
            .submit_batch(&CancellationToken::new(), gated.executor(), vec![1, 2])
            .collect()
            .await;
        assert_eq!(results, vec![Err(DispatchError::Closed), Err(DispatchError::Closed)]);
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_stops_streaming() {
        let d = dispatcher(2, 0);
        let mut events = d.bus.subscribe();
        let gated = Gated::new();
        let ctx = CancellationToken::new();
        let mut stream = d.submit_batch(&ctx, gated.executor(), vec![1, 2, 3]);

        eventually(|| gated.running.load(Ordering::SeqCst) == 2).await;
        ctx.cancel();

        assert!(stream.recv().await.is_none());
        eventually(|| d.in_flight() == 0).await;
        assert_eq!(d.busy_slots(), 0);
        assert_eq!(gated.calls.load(Ordering::SeqCst), 2, "third item never ran");

        let mut canceled = 0;
        while let Ok(ev) = events.try_recv() {
            assert_ne!(ev.kind, EventKind::TaskCompleted);
            if ev.kind == EventKind::TaskCanceled {
                canceled += 1;
            }
        }
        assert_eq!(canceled, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_executor_call_releases_slot() {
        let d = dispatcher(1, 3);
        let slow = ExecutorFn::arc("slow", |_ctx: CancellationToken, n: u32| async move {
            sleep(Duration::from_secs(3600)).await;
            Ok::<_, ExecutorError>(n)
        });

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let started = tokio::time::Instant::now();
        let res = d.submit(Task::new(slow, 1, ctx)).await;
        assert_eq!(res, Err(DispatchError::Canceled));
        assert!(started.elapsed() < Duration::from_secs(1));

        let quick = ExecutorFn::arc("quick", |_ctx: CancellationToken, n: u32| async move {
            Ok::<_, ExecutorError>(n + 1)
        });
        let res = d.submit(Task::new(quick, 1, CancellationToken::new())).await;
        assert_eq!(res, Ok(2));
        assert_eq!(d.busy_slots(), 0);
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unslotted_runs_while_slots_are_held() {
        let d = dispatcher(1, 0);
        let gated = Gated::new();
        let holder = d.submit(Task::new(gated.executor(), 1, CancellationToken::new()));
        eventually(|| d.busy_slots() == 1).await;

        let health = ExecutorFn::arc("health", |_ctx: CancellationToken, _: ()| async move {
            Ok::<_, ExecutorError>("ok")
        });
        let res = timeout(
            Duration::from_secs(1),
            d.submit_unslotted(Task::new(health, (), CancellationToken::new())),
        )
        .await
        .expect("unslotted work must not wait for a slot");
        assert_eq!(res, Ok("ok"));
        assert_eq!(d.busy_slots(), 1);

        gated.open();
        assert_eq!(holder.await, Ok(1));
    }

    #[tokio::test]
    async fn test_close_waits_for_unslotted_work() {
        let d = Arc::new(dispatcher(1, 0));
        let gated = Gated::new();
        let pending = d.submit_unslotted(Task::new(gated.executor(), 4, CancellationToken::new()));
        eventually(|| gated.running.load(Ordering::SeqCst) == 1).await;
        assert_eq!(d.busy_slots(), 0);
        assert_eq!(d.in_flight(), 1);

        let closing = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.close().await }
        });
        sleep(Duration::from_millis(20)).await;
        assert!(!closing.is_finished(), "close() must wait for unslotted work");

        let late = d
            .submit_unslotted(Task::new(gated.executor(), 5, CancellationToken::new()))
            .await;
        assert_eq!(late, Err(DispatchError::Closed));

        gated.open();
        assert_eq!(pending.await, Ok(4));
        timeout(Duration::from_secs(1), closing)
            .await
            .expect("close() returns after the drain")
            .unwrap();
        assert_eq!(d.state(), DispatcherState::Closed);
    }

    #[test]
    fn test_submit_outside_runtime_is_rejected() {
        let d = dispatcher(2, 0);
        let gated = Gated::new();

        let res = futures::executor::block_on(d.submit(Task::new(
            gated.executor(),
            1,
            CancellationToken::new(),
        )));
        assert_eq!(res, Err(DispatchError::NoRuntime));

        let results: Vec<_> = futures::executor::block_on(
            d.submit_batch(&CancellationToken::new(), gated.executor(), vec![1, 2])
                .collect(),
        );
        assert_eq!(
            results,
            vec![Err(DispatchError::NoRuntime), Err(DispatchError::NoRuntime)]
        );
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
        assert_eq!(d.in_flight(), 0);
        assert_eq!(d.state(), DispatcherState::Open);
    }
}
