use std::sync::Arc;

use crate::{
    config::DispatcherConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::dispatcher::Dispatcher;

/// Builder for constructing a [`Dispatcher`] with optional event subscribers.
pub struct DispatcherBuilder {
    cfg: DispatcherConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl DispatcherBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: DispatcherConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive dispatcher events (submissions, attempts, backoffs,
    /// outcomes, shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the dispatcher.
    ///
    /// Must be called from within a Tokio runtime when subscribers are configured,
    /// since each one gets its own worker task.
    pub fn build(self) -> Dispatcher {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            let set = Arc::new(SubscriberSet::new(self.subscribers));
            set.listen(bus.subscribe());
        }
        Dispatcher::new_internal(&self.cfg, bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use crate::events::{Event, EventKind};
    use crate::tasks::{ExecutorFn, Task};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Kinds(Arc<Mutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    #[tokio::test]
    async fn test_subscribers_observe_task_and_shutdown_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Kinds(Arc::clone(&seen)))];
        let d = DispatcherBuilder::new(DispatcherConfig::default())
            .with_subscribers(subs)
            .build();

        let exec = ExecutorFn::arc("echo", |_ctx: CancellationToken, n: u8| async move {
            Ok::<_, ExecutorError>(n)
        });
        assert_eq!(d.submit(Task::new(exec, 1, CancellationToken::new())).await, Ok(1));
        d.close().await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while !seen.lock().unwrap().contains(&EventKind::Drained) {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("subscriber sees the drain");

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                EventKind::TaskSubmitted,
                EventKind::SlotAcquired,
                EventKind::AttemptStarting,
                EventKind::TaskCompleted,
                EventKind::CloseRequested,
                EventKind::Drained,
            ]
        );
    }

    #[test]
    fn test_build_without_subscribers_needs_no_runtime() {
        let d = DispatcherBuilder::new(DispatcherConfig::default().with_max_concurrent(4)).build();
        assert_eq!(d.capacity(), 4);
        assert_eq!(d.in_flight(), 0);
        assert!(!d.is_closed());
    }
}
