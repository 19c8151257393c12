//! Shared domain types for the LoRA generation control plane: job entities,
//! the canonical status vocabulary, the error taxonomy, adapter catalog
//! entries, recommendation cache keys, configuration, and the small
//! building-block macros and utilities every other crate in the workspace
//! depends on.

pub mod macros;

pub mod adapter;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod id;
pub mod job;
pub mod status;

pub use adapter::{Adapter, AdapterId};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Config;
pub use error::CoreError;
pub use event::{SequenceCounter, StatusEvent};
pub use fingerprint::{FingerprintKind, RecommendationFingerprint};
pub use id::IdBuf;
pub use job::{GenerationParams, ImageRef, Job, JobId, JobMode, JobPatch, JobResult};
pub use status::CanonicalStatus;
