use crate::cancellation::CancellationRegistry;
use crate::sink::ProgressSink;
use loraflow_core::{
    CanonicalStatus, Clock, ImageRef, JobId, JobPatch, JobResult, SequenceCounter, StatusEvent,
};
use loraflow_generator::{normalize, GenerationRequest, Generator, Normalized};
use loraflow_store::JobStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tunables for one worker (spec §4.E, expanded spec §1.3).
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub max_job_duration: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_job_duration: Duration::from_secs(600),
        }
    }
}

/// Drives jobs from `queued` through `processing` to a terminal state.
///
/// One `DeliveryWorker` instance is shared (behind `Arc`) across as many
/// concurrent tasks as `worker_concurrency` specifies; each task pulls job
/// ids off the same queue receiver and calls [`DeliveryWorker::run_job`].
pub struct DeliveryWorker<G, S, C> {
    store: JobStore,
    generator: Arc<G>,
    sink: Arc<S>,
    clock: C,
    cancellations: CancellationRegistry,
    settings: WorkerSettings,
}

impl<G, S, C> DeliveryWorker<G, S, C>
where
    G: Generator,
    S: ProgressSink,
    C: Clock,
{
    pub fn new(
        store: JobStore,
        generator: Arc<G>,
        sink: Arc<S>,
        clock: C,
        cancellations: CancellationRegistry,
        settings: WorkerSettings,
    ) -> Self {
        Self { store, generator, sink, clock, cancellations, settings }
    }

    /// Drive a single job to completion. Safe to call more than once for
    /// the same job id (e.g. on broker redelivery): a job already terminal
    /// is a no-op (spec §4.E idempotent redelivery).
    pub async fn run_job(&self, job_id: JobId) {
        let job = match self.store.try_get(&job_id) {
            Some(job) => job,
            None => {
                warn!(%job_id, "worker received unknown job id, dropping");
                return;
            }
        };
        if job.is_terminal() {
            info!(%job_id, status = %job.status, "job already terminal, skipping redelivery");
            return;
        }

        let attempt_count = job.attempt_count + 1;
        let mut sequence = SequenceCounter::resume_from(job.sequence);
        self.start_processing(&job_id, attempt_count, &mut sequence).await;

        let request = GenerationRequest {
            prompt: job.prompt.clone(),
            negative_prompt: job.negative_prompt.clone(),
            params: job.params.clone(),
        };

        let handle = match self.generator.start(request).await {
            Ok(handle) => handle,
            Err(err) => {
                self.fail(&job_id, err.into(), &mut sequence).await;
                self.cancellations.clear(&job_id);
                return;
            }
        };

        self.poll_until_terminal(&job_id, &handle, job.progress, &mut sequence).await;
        self.cancellations.clear(&job_id);
    }

    async fn poll_until_terminal(
        &self,
        job_id: &JobId,
        handle: &str,
        initial_progress: f64,
        sequence: &mut SequenceCounter,
    ) {
        let deadline = self.clock.now()
            + chrono::Duration::from_std(self.settings.max_job_duration).unwrap_or_default();
        let mut last_status = CanonicalStatus::Processing;
        let mut last_progress = initial_progress;

        loop {
            if self.cancellations.is_cancel_requested(job_id) {
                let _ = self.generator.cancel(&handle.to_string()).await;
                self.transition_terminal(
                    job_id,
                    CanonicalStatus::Canceled,
                    JobResult::Failure {
                        error_kind: "canceled".to_string(),
                        message: "job canceled".to_string(),
                    },
                    sequence,
                )
                .await;
                return;
            }

            if self.clock.now() >= deadline {
                let _ = self.generator.cancel(&handle.to_string()).await;
                self.transition_terminal(
                    job_id,
                    CanonicalStatus::Failed,
                    JobResult::Failure {
                        error_kind: "timeout".to_string(),
                        message: "job exceeded maximum duration".to_string(),
                    },
                    sequence,
                )
                .await;
                return;
            }

            match self.generator.poll(&handle.to_string()).await {
                Ok(raw_status) => {
                    let normalized = normalize(&raw_status, last_progress);
                    if normalized.status.is_terminal() {
                        let result = terminal_result(&normalized, &raw_status);
                        self.transition_terminal(job_id, normalized.status, result, sequence).await;
                        return;
                    }
                    // spec §4.E step 4: only write/publish when progress
                    // advanced or the status itself changed, so a worker
                    // polling every second doesn't flood the broadcaster
                    // with identical intermediate events.
                    let progress_advanced = normalized.progress > last_progress;
                    let status_changed = normalized.status != last_status;
                    if progress_advanced || status_changed {
                        self.transition(job_id, normalized.status, normalized.progress, sequence).await;
                        last_status = normalized.status;
                        last_progress = normalized.progress;
                    }
                }
                Err(err) => {
                    self.fail(job_id, err.into(), sequence).await;
                    return;
                }
            }

            tokio::time::sleep(jittered(self.settings.poll_interval)).await;
        }
    }

    async fn start_processing(&self, job_id: &JobId, attempt_count: u32, sequence: &mut SequenceCounter) {
        let seq = sequence.next();
        let patch = JobPatch::default()
            .status(CanonicalStatus::Processing)
            .progress(0.0);
        let patch = JobPatch { attempt_count: Some(attempt_count), sequence: Some(seq), ..patch };
        if self.store.update(job_id, patch, &self.clock).is_err() {
            return;
        }
        self.publish(job_id, CanonicalStatus::Processing, 0.0, None, None, seq).await;
    }

    async fn transition(&self, job_id: &JobId, status: CanonicalStatus, progress: f64, sequence: &mut SequenceCounter) {
        let seq = sequence.next();
        let patch = JobPatch { sequence: Some(seq), ..JobPatch::default().status(status).progress(progress) };
        if self.store.update(job_id, patch, &self.clock).is_err() {
            return;
        }
        self.publish(job_id, status, progress, None, None, seq).await;
    }

    async fn transition_terminal(
        &self,
        job_id: &JobId,
        status: CanonicalStatus,
        result: JobResult,
        sequence: &mut SequenceCounter,
    ) {
        let seq = sequence.next();
        let progress = if status == CanonicalStatus::Completed { 1.0 } else { 0.0 };
        let patch = JobPatch {
            sequence: Some(seq),
            ..JobPatch::default().status(status).progress(progress).result(result.clone())
        };
        if self.store.update(job_id, patch, &self.clock).is_err() {
            return;
        }
        self.publish(job_id, status, progress, None, Some(result), seq).await;
    }

    async fn fail(&self, job_id: &JobId, err: loraflow_core::CoreError, sequence: &mut SequenceCounter) {
        self.transition_terminal(
            job_id,
            CanonicalStatus::Failed,
            JobResult::Failure { error_kind: err.kind().to_string(), message: err.to_string() },
            sequence,
        )
        .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn publish(
        &self,
        job_id: &JobId,
        status: CanonicalStatus,
        progress: f64,
        message: Option<String>,
        result: Option<JobResult>,
        sequence: u64,
    ) {
        let event = StatusEvent {
            job_id: job_id.clone(),
            status,
            progress,
            message,
            result,
            sequence,
            timestamp: self.clock.now(),
        };
        self.sink.publish(event).await;
    }
}

fn terminal_result(normalized: &Normalized, raw: &loraflow_generator::GenerationStatus) -> JobResult {
    match normalized.status {
        CanonicalStatus::Completed => JobResult::Success {
            images: raw
                .images
                .iter()
                .map(|url| ImageRef { url: url.clone(), seed: None })
                .collect(),
        },
        CanonicalStatus::Failed => JobResult::Failure {
            error_kind: "generator_rejected".to_string(),
            message: normalized
                .message
                .clone()
                .or_else(|| raw.error.clone())
                .unwrap_or_else(|| "generation failed".to_string()),
        },
        CanonicalStatus::Canceled => JobResult::Failure {
            error_kind: "canceled".to_string(),
            message: "job canceled".to_string(),
        },
        CanonicalStatus::Queued | CanonicalStatus::Processing => {
            unreachable!("caller guarantees terminal status")
        }
    }
}

/// Add up to 20% jitter so many concurrent workers don't poll in lockstep.
fn jittered(base: Duration) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 5).max(1));
    base + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
