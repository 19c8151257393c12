//! Adapter wiring the Delivery Worker's [`ProgressSink`] seam to the
//! Progress Broadcaster, keeping the dependency edge F -> E out of the
//! `loraflow-worker`/`loraflow-broadcaster` crates themselves.

use async_trait::async_trait;
use loraflow_broadcaster::ProgressBroadcaster;
use loraflow_core::{Clock, StatusEvent};
use loraflow_worker::ProgressSink;

pub struct BroadcastSink<C> {
    broadcaster: ProgressBroadcaster<C>,
}

impl<C> BroadcastSink<C> {
    pub fn new(broadcaster: ProgressBroadcaster<C>) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl<C: Clock> ProgressSink for BroadcastSink<C> {
    async fn publish(&self, event: StatusEvent) {
        self.broadcaster.publish(event).await;
    }
}
