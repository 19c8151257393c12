//! The Job Store (spec §4.A): the single source of truth for job state.
//!
//! All reads and writes go through one [`JobStore`], which holds its map
//! behind a single lock — the same shape the rest of the workspace uses for
//! shared mutable state. A whole-map lock is enough to make every
//! create/get/update/list/delete transactional with respect to a given
//! job id; the store's job is correctness, not read concurrency, so no
//! finer-grained locking is attempted.

mod error;
mod snapshot;
mod store;

pub use error::StoreError;
pub use snapshot::{load_snapshot, write_snapshot};
pub use store::{JobFilter, JobStore};
