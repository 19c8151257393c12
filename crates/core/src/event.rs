//! Status events published by workers and fanned out by the broadcaster
//! (spec §3.1, §4.F).

use crate::job::{JobResult, JobId};
use crate::status::CanonicalStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status transition for one job.
///
/// `sequence` is strictly increasing per `job_id`, assigned by the worker
/// that owns the job; consumers use it to detect and discard reordered or
/// duplicate deliveries (spec §4.F).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub job_id: JobId,
    pub status: CanonicalStatus,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Per-job monotonic sequence counter. One instance lives with the worker
/// task driving that job; never shared across jobs.
///
/// A job redelivered while still non-terminal (worker crash mid-attempt,
/// broker at-least-once redelivery) must not restart numbering from zero —
/// that would let a later-published event carry a smaller `sequence` than
/// one already published this job's lifetime. Callers resume counting from
/// the job's last persisted `sequence` via [`SequenceCounter::resume_from`]
/// rather than always starting fresh.
#[derive(Debug, Default)]
pub struct SequenceCounter(u64);

impl SequenceCounter {
    /// Resume numbering after `last`, the most recently persisted sequence
    /// for this job (`0` for a job that has never emitted an event).
    pub fn resume_from(last: u64) -> Self {
        Self(last)
    }

    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

crate::builder! {
    pub struct StatusEventBuilder => StatusEvent {
        set {
            job_id: JobId = JobId::new(),
            status: CanonicalStatus = CanonicalStatus::Queued,
            progress: f64 = 0.0,
            message: Option<String> = None,
            result: Option<JobResult> = None,
            sequence: u64 = 1,
        }
        computed {
            timestamp: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
