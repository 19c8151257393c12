use crate::settings::BroadcasterSettings;
use crate::subscription::{CloseReason, Filter, Subscription};
use chrono::{DateTime, Utc};
use loraflow_core::{Clock, JobId, StatusEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct SubscriberEntry {
    filter: Filter,
    sender: mpsc::Sender<StatusEvent>,
    close_reason: Arc<Mutex<Option<CloseReason>>>,
}

struct ReplayEntry {
    event: StatusEvent,
    recorded_at: DateTime<Utc>,
}

struct Inner<C> {
    subscribers: RwLock<indexmap::IndexMap<u64, SubscriberEntry>>,
    next_id: AtomicU64,
    /// One mutex per job id, serializing publishes so per-job ordering is
    /// preserved even when multiple callers race to publish (spec §5). An
    /// async mutex, not `parking_lot`'s, because the guard is held across
    /// the `.await` points in the terminal-retry path below.
    job_locks: Mutex<HashMap<JobId, Arc<tokio::sync::Mutex<()>>>>,
    replay: Mutex<HashMap<JobId, ReplayEntry>>,
    settings: BroadcasterSettings,
    clock: C,
}

/// WebSocket-hub-shaped fan-out of per-job status events (spec §4.F).
///
/// Cheap to clone: all state lives behind an `Arc`, matching the rest of the
/// workspace's shared-handle shape (`JobStore`, `AdapterCatalog`).
pub struct ProgressBroadcaster<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for ProgressBroadcaster<C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<C: Clock> ProgressBroadcaster<C> {
    pub fn new(settings: BroadcasterSettings, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(indexmap::IndexMap::new()),
                next_id: AtomicU64::new(1),
                job_locks: Mutex::new(HashMap::new()),
                replay: Mutex::new(HashMap::new()),
                settings,
                clock,
            }),
        }
    }

    /// Register a new subscriber. If `filter` targets a specific job and a
    /// still-fresh terminal event for it exists, that event is delivered
    /// immediately after subscribing (spec §4.F "did I miss the end?").
    pub fn subscribe(&self, filter: Filter) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.settings.buffer_size.max(1));

        if let Filter::Job(job_id) = &filter {
            self.replay_if_fresh(job_id, &sender);
        }

        let close_reason = Arc::new(Mutex::new(None));
        self.inner.subscribers.write().insert(
            id,
            SubscriberEntry { filter: filter.clone(), sender, close_reason: close_reason.clone() },
        );

        let inner = self.inner.clone();
        Subscription {
            id,
            filter,
            receiver,
            close_reason,
            reported_close: false,
            unsubscribe: Some(Box::new(move |id| {
                inner.subscribers.write().shift_remove(&id);
            })),
        }
    }

    fn replay_if_fresh(&self, job_id: &JobId, sender: &mpsc::Sender<StatusEvent>) {
        let mut replay = self.inner.replay.lock();
        self.prune_expired(&mut replay);
        if let Some(entry) = replay.get(job_id) {
            let _ = sender.try_send(entry.event.clone());
        }
    }

    fn prune_expired(&self, replay: &mut HashMap<JobId, ReplayEntry>) {
        let now = self.inner.clock.now();
        let retain = chrono::Duration::from_std(self.inner.settings.terminal_retain).unwrap_or_default();
        replay.retain(|_, entry| now - entry.recorded_at <= retain);
    }

    fn job_lock(&self, job_id: &JobId) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .job_locks
            .lock()
            .entry(job_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Publish one status event to every matching subscriber, applying the
    /// drop-intermediate backpressure policy (spec §4.F):
    /// - non-terminal events are dropped on a full buffer;
    /// - terminal events are retried for `terminal_retry_deadline`; if still
    ///   undeliverable, the subscription is closed as a slow consumer.
    ///
    /// Per-job ordering is guaranteed by serializing publishes for a given
    /// job id through one lock; cross-job ordering is not guaranteed (spec §5).
    pub async fn publish(&self, event: StatusEvent) {
        let job_lock = self.job_lock(&event.job_id);
        let _guard = job_lock.lock().await;

        if event.is_terminal() {
            let mut replay = self.inner.replay.lock();
            self.prune_expired(&mut replay);
            replay.insert(
                event.job_id.clone(),
                ReplayEntry { event: event.clone(), recorded_at: self.inner.clock.now() },
            );
        }

        let targets: Vec<(u64, mpsc::Sender<StatusEvent>, Arc<Mutex<Option<CloseReason>>>)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .filter(|(_, entry)| entry.filter.matches(&event.job_id))
            .map(|(id, entry)| (*id, entry.sender.clone(), entry.close_reason.clone()))
            .collect();

        let mut slow_consumers = Vec::new();
        for (id, sender, close_reason) in targets {
            if sender.try_send(event.clone()).is_ok() {
                continue;
            }

            if !event.is_terminal() {
                debug!(job_id = %event.job_id, subscriber = id, "dropping non-terminal event for full subscriber buffer");
                continue;
            }

            let deadline = self.inner.settings.terminal_retry_deadline;
            let delivered = tokio::time::timeout(deadline, sender.send(event.clone()))
                .await
                .map(|r| r.is_ok())
                .unwrap_or(false);

            if !delivered {
                warn!(job_id = %event.job_id, subscriber = id, "closing slow consumer: terminal event undeliverable within grace period");
                *close_reason.lock() = Some(CloseReason::SlowConsumer);
                slow_consumers.push(id);
            }
        }

        if !slow_consumers.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in slow_consumers {
                subscribers.shift_remove(&id);
            }
        }
    }

    /// Close every live subscription with `server_shutdown` and wait up to
    /// `shutdown_drain` for their buffers to empty (spec §4.F).
    pub async fn broadcast_shutdown(&self) {
        let senders: Vec<mpsc::Sender<StatusEvent>> = {
            let mut subscribers = self.inner.subscribers.write();
            for entry in subscribers.values() {
                *entry.close_reason.lock() = Some(CloseReason::ServerShutdown);
            }
            let senders = subscribers.values().map(|e| e.sender.clone()).collect();
            subscribers.clear();
            senders
        };

        let deadline = self.inner.clock.now()
            + chrono::Duration::from_std(self.inner.settings.shutdown_drain).unwrap_or_default();
        loop {
            let all_drained = senders.iter().all(|s| s.capacity() == s.max_capacity());
            if all_drained || self.inner.clock.now() >= deadline {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}
