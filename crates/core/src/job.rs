//! The central [`Job`] entity and its state machine (spec §3.1, §4.A).

use crate::adapter::AdapterId;
use crate::clock::Clock;
use crate::status::CanonicalStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a generation job.
    pub struct JobId("job-");
}

/// Dispatch path requested at job creation (spec §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Immediate,
    Queued,
}

/// Generation parameters, validated by the coordinator before job creation
/// (spec §4.G) and stored opaquely thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub sampler: String,
    pub steps: u32,
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
    pub seed: Option<i64>,
    pub batch_size: u32,
}

impl GenerationParams {
    /// Validate the bounds from spec §4.G. Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=150).contains(&self.steps) {
            return Err(format!("steps must be in 1..=150, got {}", self.steps));
        }
        if !(1.0..=30.0).contains(&self.cfg_scale) {
            return Err(format!("cfg_scale must be in 1.0..=30.0, got {}", self.cfg_scale));
        }
        Self::validate_dimension("width", self.width)?;
        Self::validate_dimension("height", self.height)?;
        if !(1..=16).contains(&self.batch_size) {
            return Err(format!("batch_size must be in 1..=16, got {}", self.batch_size));
        }
        Ok(())
    }

    fn validate_dimension(name: &str, value: u32) -> Result<(), String> {
        if !(64..=2048).contains(&value) {
            return Err(format!("{name} must be in 64..=2048, got {value}"));
        }
        if value % 8 != 0 {
            return Err(format!("{name} must be 8-pixel aligned, got {value}"));
        }
        Ok(())
    }
}

/// A single image reference in a (possibly multi-image) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Outcome payload for a terminal job (spec §3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    Success { images: Vec<ImageRef> },
    Failure { error_kind: String, message: String },
}

/// A partial update applied transactionally by the Job Store (spec §4.A).
///
/// `status`/`progress`/`result` are the fields a worker writes on each poll
/// tick; `rating`/`is_favorite` are user-writable fields the core preserves
/// but never originates.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<CanonicalStatus>,
    pub progress: Option<f64>,
    pub result: Option<JobResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempt_count: Option<u32>,
    pub sequence: Option<u64>,
    pub rating: Option<Option<u8>>,
    pub is_favorite: Option<bool>,
}

impl JobPatch {
    pub fn status(mut self, status: CanonicalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn result(mut self, result: JobResult) -> Self {
        self.result = Some(result);
        self
    }
}

/// The central entity: one LoRA-decorated image generation request and its
/// lifecycle (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub mode: JobMode,
    pub params: GenerationParams,
    /// Adapters composed into `prompt`, in application order.
    pub adapters: Vec<AdapterId>,
    pub status: CanonicalStatus,
    pub progress: f64,
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub is_favorite: bool,
    pub attempt_count: u32,
    /// Sequence number of the last status event emitted for this job (spec
    /// §3.1: starts at `0` on `create`). The worker resumes its
    /// [`crate::SequenceCounter`] from here on redelivery instead of
    /// restarting numbering at 1.
    pub sequence: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        prompt: String,
        negative_prompt: Option<String>,
        mode: JobMode,
        params: GenerationParams,
        adapters: Vec<AdapterId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            prompt,
            negative_prompt,
            mode,
            params,
            adapters,
            status: CanonicalStatus::Queued,
            progress: 0.0,
            result: None,
            created_at: clock.now(),
            started_at: None,
            finished_at: None,
            rating: None,
            is_favorite: false,
            attempt_count: 0,
            sequence: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a patch, enforcing the invariants of spec §3.1 and §4.A.
    /// Rejects any patch that would move a terminal job back to non-terminal.
    pub fn apply_patch(&mut self, patch: JobPatch, clock: &impl Clock) -> Result<(), String> {
        if self.is_terminal() {
            if let Some(new_status) = patch.status {
                if new_status != self.status {
                    return Err(format!(
                        "cannot transition terminal job {} from {} to {}",
                        self.id, self.status, new_status
                    ));
                }
            }
            // Idempotent redelivery: terminal jobs accept no further writes.
            return Ok(());
        }

        if let Some(status) = patch.status {
            if status == CanonicalStatus::Processing && self.started_at.is_none() {
                self.started_at = Some(clock.now());
            }
            if status.is_terminal() {
                self.finished_at = Some(clock.now());
            }
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress).clamp(0.0, 1.0);
        }
        if let Some(result) = patch.result {
            self.result = Some(result);
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(finished_at) = patch.finished_at {
            self.finished_at = Some(finished_at);
        }
        if let Some(attempt_count) = patch.attempt_count {
            self.attempt_count = attempt_count;
        }
        if let Some(sequence) = patch.sequence {
            self.sequence = sequence;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }

        if self.status == CanonicalStatus::Completed {
            self.progress = 1.0;
        }
        Ok(())
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            prompt: String = "a cat",
        }
        set {
            negative_prompt: Option<String> = None,
            mode: JobMode = JobMode::Queued,
            params: GenerationParams = GenerationParams {
                sampler: "euler".to_string(),
                steps: 20,
                cfg_scale: 7.0,
                width: 512,
                height: 512,
                seed: None,
                batch_size: 1,
            },
            adapters: Vec<AdapterId> = Vec::new(),
            status: CanonicalStatus = CanonicalStatus::Queued,
            progress: f64 = 0.0,
            result: Option<JobResult> = None,
            started_at: Option<DateTime<Utc>> = None,
            finished_at: Option<DateTime<Utc>> = None,
            rating: Option<u8> = None,
            is_favorite: bool = false,
            attempt_count: u32 = 0,
            sequence: u64 = 0,
        }
        computed {
            id: JobId = JobId::new(),
            created_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
