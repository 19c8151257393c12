use loraflow_core::JobId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Tracks which jobs have been asked to cancel. The coordinator's
/// `cancel_job` operation (spec §4.G) records an id here; the delivery
/// worker polls it between generator round-trips so cancellation takes
/// effect on the next poll tick rather than requiring its own channel per
/// job.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    requested: Arc<Mutex<HashSet<JobId>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self, job_id: JobId) {
        self.requested.lock().insert(job_id);
    }

    pub fn is_cancel_requested(&self, job_id: &JobId) -> bool {
        self.requested.lock().contains(job_id)
    }

    /// Clear the flag once a job has reached a terminal state, so the set
    /// doesn't grow unboundedly over the life of the process.
    pub fn clear(&self, job_id: &JobId) {
        self.requested.lock().remove(job_id);
    }
}
