//! The Delivery Worker (spec §4.E): drives one job from `queued` through
//! `processing` to a terminal state by polling the generator client and
//! writing every transition back through the job store.

mod cancellation;
mod delivery;
mod sink;

pub use cancellation::CancellationRegistry;
pub use delivery::{DeliveryWorker, WorkerSettings};
pub use sink::ProgressSink;
