//! The Progress Broadcaster (spec §4.F): a WebSocket-hub-shaped pub/sub that
//! fans out per-job [`StatusEvent`]s to subscribed clients.
//!
//! Invariants enforced here, not by callers:
//! - per-job publish ordering (a mutex per job id serializes concurrent
//!   publishers, matching spec §5's "per-job mutex for publish");
//! - bounded subscriber buffers with a drop-intermediate backpressure policy;
//! - terminal-event replay for clients that subscribe to a specific job id
//!   shortly after it finished.

mod hub;
mod settings;
mod subscription;

pub use hub::ProgressBroadcaster;
pub use settings::BroadcasterSettings;
pub use subscription::{CloseReason, Filter, Subscription, SubscriptionEvent};

#[cfg(test)]
mod tests;
