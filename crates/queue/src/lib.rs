//! The Queue Orchestrator (spec §4.D): dispatches job ids into a bounded
//! channel that workers drain. Normally backed by a durable broker; falls
//! back to an in-process channel when the broker is unreachable, and
//! recovers when it comes back, logging only on each transition edge.

mod backend;
mod orchestrator;

pub use backend::{BrokerBackend, InProcessBackend, QueueBackend};
pub use orchestrator::QueueOrchestrator;
