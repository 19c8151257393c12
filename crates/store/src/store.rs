use crate::error::StoreError;
use indexmap::IndexMap;
use loraflow_core::{CanonicalStatus, Clock, Job, JobId, JobPatch};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Filter applied by `list` (spec §6 `GET /jobs` query parameters).
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<CanonicalStatus>,
    pub limit: usize,
    /// Exclusive cursor: only jobs created strictly before this one (by
    /// insertion order) are returned. `None` starts from the most recent.
    pub cursor: Option<JobId>,
}

/// The single source of truth for job state (spec §4.A).
#[derive(Clone)]
pub struct JobStore {
    inner: Arc<Mutex<IndexMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Rehydrate from a snapshot (spec §2 supplemental persistence feature).
    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let store = Self::new();
        {
            let mut map = store.inner.lock();
            for job in jobs {
                map.insert(job.id.clone(), job);
            }
        }
        store
    }

    pub fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut map = self.inner.lock();
        if map.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id.to_string()));
        }
        map.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.inner
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn try_get(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().get(id).cloned()
    }

    /// Apply a patch transactionally. Idempotent redelivery of a terminal
    /// patch to an already-terminal job is accepted silently; a patch that
    /// would move a terminal job to a *different* status is rejected.
    pub fn update(
        &self,
        id: &JobId,
        patch: JobPatch,
        clock: &impl Clock,
    ) -> Result<Job, StoreError> {
        let mut map = self.inner.lock();
        let job = map.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.apply_patch(patch, clock).map_err(|reason| StoreError::InvalidTransition {
            job_id: id.to_string(),
            reason,
        })?;
        Ok(job.clone())
    }

    /// Remove a job entirely. Used by admin tooling, not by the normal job
    /// lifecycle (spec §2 `loraflowctl` supplemental feature). Refuses to
    /// delete a job still in flight (spec §4.A) — cleanup is for finished
    /// work only.
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let mut map = self.inner.lock();
        let job = map.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !job.is_terminal() {
            return Err(StoreError::InvalidTransition {
                job_id: id.to_string(),
                reason: "refusing to delete a non-terminal job".to_string(),
            });
        }
        map.shift_remove(id);
        Ok(())
    }

    /// List jobs newest-first, optionally filtered by status, paginated by
    /// an exclusive cursor (spec §6).
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let map = self.inner.lock();
        let mut items: Vec<&Job> = map.values().collect();
        items.reverse(); // newest first; insertion order is creation order

        let start = match &filter.cursor {
            Some(cursor) => items
                .iter()
                .position(|job| &job.id == cursor)
                .map(|idx| idx + 1)
                .unwrap_or(items.len()),
            None => 0,
        };

        let limit = if filter.limit == 0 { usize::MAX } else { filter.limit };

        items
            .into_iter()
            .skip(start)
            .filter(|job| filter.status.map(|s| job.status == s).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.inner.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Mark every non-terminal job as failed. Used on generator-unreachable
    /// shutdown paths so no job is left silently stuck (spec §4.B).
    pub fn fail_all_nonterminal(&self, error_kind: &str, message: &str, clock: &impl Clock) {
        let mut map = self.inner.lock();
        for job in map.values_mut() {
            if job.is_terminal() {
                continue;
            }
            let patch = JobPatch::default()
                .status(CanonicalStatus::Failed)
                .result(loraflow_core::JobResult::Failure {
                    error_kind: error_kind.to_string(),
                    message: message.to_string(),
                });
            if let Err(reason) = job.apply_patch(patch, clock) {
                warn!(job_id = %job.id, %reason, "failed to force-fail job during shutdown");
            }
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
