use loraflow_core::{JobId, StatusEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a subscriber asked to receive (spec §4.F: "all events or a specific job_id").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Job(JobId),
}

impl Filter {
    pub(crate) fn matches(&self, job_id: &JobId) -> bool {
        match self {
            Filter::All => true,
            Filter::Job(id) => id == job_id,
        }
    }
}

/// Why the hub closed a subscription (spec §6 WebSocket close reasons).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The subscriber's buffer stayed full through the terminal-delivery
    /// grace period.
    SlowConsumer,
    /// `broadcast_shutdown` was called.
    ServerShutdown,
    /// The caller closed the subscription itself.
    Normal,
}

/// One item delivered to a subscriber: either a status event it matched, or
/// the terminal notice that no further events will follow.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    Status(StatusEvent),
    Closed(CloseReason),
}

/// A live subscription handle. Dropping it (or calling [`Subscription::close`])
/// unregisters it from the hub; closing is idempotent (spec §4.F).
///
/// The close notice travels out-of-band from the bounded event buffer (in a
/// one-shot slot, not through the channel itself) so it is never lost to the
/// same backpressure that can drop intermediate status events.
pub struct Subscription {
    pub(crate) id: u64,
    pub(crate) filter: Filter,
    pub(crate) receiver: mpsc::Receiver<StatusEvent>,
    pub(crate) close_reason: Arc<Mutex<Option<CloseReason>>>,
    pub(crate) reported_close: bool,
    pub(crate) unsubscribe: Option<Box<dyn FnOnce(u64) + Send>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Receive the next item. Yields every buffered [`StatusEvent`] first;
    /// once the hub has dropped this subscription, yields exactly one
    /// [`SubscriptionEvent::Closed`] and then `None` forever after.
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        if let Some(event) = self.receiver.recv().await {
            return Some(SubscriptionEvent::Status(event));
        }
        if self.reported_close {
            return None;
        }
        self.reported_close = true;
        let reason = self.close_reason.lock().take().unwrap_or(CloseReason::Normal);
        Some(SubscriptionEvent::Closed(reason))
    }

    /// Unregister from the hub. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            *self.close_reason.lock() = Some(CloseReason::Normal);
            unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
