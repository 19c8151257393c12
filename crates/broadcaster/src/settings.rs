use std::time::Duration;

/// Tunables for one [`crate::ProgressBroadcaster`] (spec §4.F, expanded spec §1.3).
#[derive(Debug, Clone)]
pub struct BroadcasterSettings {
    /// Per-subscription bounded send buffer (spec §4.F default 64).
    pub buffer_size: usize,
    /// How long a terminal event is replayed to a newly subscribing client
    /// (spec §4.F default 5 minutes / `ws_terminal_retain_s`).
    pub terminal_retain: Duration,
    /// Grace period to deliver a terminal event to a full buffer before
    /// closing the subscription as a slow consumer (spec §4.F default 500ms).
    pub terminal_retry_deadline: Duration,
    /// How long `broadcast_shutdown` waits for subscriber buffers to drain
    /// (spec §4.F default 2s).
    pub shutdown_drain: Duration,
}

impl Default for BroadcasterSettings {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            terminal_retain: Duration::from_secs(300),
            terminal_retry_deadline: Duration::from_millis(500),
            shutdown_drain: Duration::from_secs(2),
        }
    }
}
