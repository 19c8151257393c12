use crate::backend::{InProcessBackend, QueueBackend};
use loraflow_core::{CoreError, JobId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// How long `run_broker_consumer` sleeps after an empty poll or a failed
/// one, so a durable broker with nothing ready doesn't get hammered.
const CONSUMER_IDLE_INTERVAL: Duration = Duration::from_millis(200);

/// Dispatches job ids to whichever backend is currently healthy, preferring
/// the durable broker and falling back to an in-process channel (spec
/// §4.D). A single `degraded` flag tracks the last known health state so a
/// warning is logged only on the transition into degraded mode, and an info
/// line only on recovery — never once per submission.
pub struct QueueOrchestrator {
    broker: Option<Arc<dyn QueueBackend>>,
    fallback: Arc<InProcessBackend>,
    degraded: AtomicBool,
    /// Serializes the fallback-selection decision so concurrent submitters
    /// don't race on the degraded flag and double-log a transition.
    transition_lock: Mutex<()>,
}

impl QueueOrchestrator {
    /// Build an orchestrator with no durable broker — the in-process
    /// backend is used from first boot (spec §4.D "no broker configured").
    pub fn in_process_only(capacity: usize) -> (Self, mpsc::Receiver<JobId>) {
        let (fallback, receiver) = InProcessBackend::channel(capacity);
        let orchestrator = Self {
            broker: None,
            fallback: Arc::new(fallback),
            degraded: AtomicBool::new(false),
            transition_lock: Mutex::new(()),
        };
        (orchestrator, receiver)
    }

    /// Build an orchestrator backed by a durable broker, with the
    /// in-process channel ready as a fallback.
    pub fn with_broker(
        broker: Arc<dyn QueueBackend>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<JobId>) {
        let (fallback, receiver) = InProcessBackend::channel(capacity);
        let orchestrator = Self {
            broker: Some(broker),
            fallback: Arc::new(fallback),
            degraded: AtomicBool::new(false),
            transition_lock: Mutex::new(()),
        };
        (orchestrator, receiver)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Dispatch one job id. Tries the broker first (if configured); on
    /// failure, degrades to the in-process backend and logs the
    /// transition exactly once.
    pub async fn submit(&self, job_id: JobId) -> Result<(), CoreError> {
        let Some(broker) = &self.broker else {
            return self.fallback.submit(job_id).await;
        };

        match broker.submit(job_id.clone()).await {
            Ok(()) => {
                self.mark_healthy(&job_id);
                Ok(())
            }
            Err(err) => {
                self.mark_degraded(&job_id, &err);
                self.fallback.submit(job_id).await
            }
        }
    }

    /// Run one health-check tick against the broker, updating degraded
    /// state and logging on transition. Intended to be called on a
    /// periodic interval by the owning binary, independent of submission
    /// traffic, so degradation is detected even during a quiet period.
    pub async fn healthcheck_tick(&self) {
        let Some(broker) = &self.broker else {
            return;
        };
        match broker.healthcheck().await {
            Ok(()) => self.mark_healthy_general(),
            Err(err) => self.mark_degraded_general(&err),
        }
    }

    /// Continuously drain jobs the broker has delivered and forward them
    /// onto the same in-process channel `spawn_workers` drains, so a job
    /// dispatched through a healthy broker still reaches a worker instead of
    /// sitting in `queued` forever (spec §2 data flow, §4.D/§4.E). A no-op
    /// if no broker is configured. Intended to be spawned once by the owning
    /// binary, alongside `healthcheck_tick`, and run for the server's
    /// lifetime.
    pub async fn run_broker_consumer(&self) {
        let Some(broker) = &self.broker else {
            return;
        };
        let sender = self.fallback.sender();

        loop {
            match broker.poll_delivery().await {
                Ok(Some(job_id)) => {
                    self.mark_healthy(&job_id);
                    if sender.send(job_id).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    self.mark_healthy_general();
                    tokio::time::sleep(CONSUMER_IDLE_INTERVAL).await;
                }
                Err(err) => {
                    self.mark_degraded_general(&err);
                    tokio::time::sleep(CONSUMER_IDLE_INTERVAL).await;
                }
            }
        }
    }

    fn mark_healthy(&self, job_id: &JobId) {
        let _guard = self.transition_lock.lock();
        if self.degraded.swap(false, Ordering::AcqRel) {
            tracing::info!(job_id = %job_id, "broker recovered, resuming durable dispatch");
        }
    }

    fn mark_healthy_general(&self) {
        let _guard = self.transition_lock.lock();
        if self.degraded.swap(false, Ordering::AcqRel) {
            tracing::info!("broker healthcheck recovered, resuming durable dispatch");
        }
    }

    fn mark_degraded(&self, job_id: &JobId, err: &CoreError) {
        let _guard = self.transition_lock.lock();
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(job_id = %job_id, error = %err, "broker dispatch failed, degrading to in-process queue");
        }
    }

    fn mark_degraded_general(&self, err: &CoreError) {
        let _guard = self.transition_lock.lock();
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(error = %err, "broker healthcheck failed, degrading to in-process queue");
        }
    }
}
