use async_trait::async_trait;
use loraflow_core::StatusEvent;

/// Where the worker publishes every status transition. The broadcaster
/// implements this in production; tests use an in-memory collector. Kept as
/// a trait (rather than a direct dependency on the broadcaster crate) so
/// the worker never needs to know about WebSocket fan-out.
#[async_trait]
pub trait ProgressSink: Send + Sync + 'static {
    async fn publish(&self, event: StatusEvent);
}

/// A sink that drops every event. Used where progress publication is
/// genuinely optional (e.g. a one-off admin re-run).
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn publish(&self, _event: StatusEvent) {}
}
