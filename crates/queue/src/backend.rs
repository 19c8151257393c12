use async_trait::async_trait;
use loraflow_core::{CoreError, JobId};
use serde::Deserialize;
use tokio::sync::mpsc;

/// One dispatch transport. The in-process backend and a durable broker both
/// implement this so the orchestrator can swap between them without workers
/// noticing (spec §4.D).
#[async_trait]
pub trait QueueBackend: Send + Sync + 'static {
    async fn submit(&self, job_id: JobId) -> Result<(), CoreError>;
    async fn healthcheck(&self) -> Result<(), CoreError>;

    /// Retrieve one job id the broker has delivered, if any, without
    /// blocking for long. The in-process backend's `submit` already pushes
    /// straight onto the worker channel, so it never has anything to
    /// deliver here; a durable broker implements this as a real dequeue
    /// round trip, consumed by `QueueOrchestrator::run_broker_consumer`.
    async fn poll_delivery(&self) -> Result<Option<JobId>, CoreError> {
        Ok(None)
    }
}

/// Default backend: an in-memory bounded channel. Always healthy — it has
/// no external dependency to fail — so it never itself triggers a
/// degradation warning; it's what other backends degrade *to*.
pub struct InProcessBackend {
    sender: mpsc::Sender<JobId>,
}

impl InProcessBackend {
    /// Construct a connected sender/receiver pair. `capacity` is the queue
    /// depth before `submit` blocks (spec §4.D default 256).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<JobId>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// A clone of the sender half feeding the worker-facing receiver. Used
    /// by [`crate::QueueOrchestrator::run_broker_consumer`] to deliver
    /// broker-dequeued job ids onto the same channel workers drain.
    pub fn sender(&self) -> mpsc::Sender<JobId> {
        self.sender.clone()
    }
}

/// How long `submit` waits for channel capacity before giving up (spec
/// §4.D: "blocks for up to 5 seconds then fails with `queue_saturated`").
const SUBMIT_BLOCK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[async_trait]
impl QueueBackend for InProcessBackend {
    async fn submit(&self, job_id: JobId) -> Result<(), CoreError> {
        match tokio::time::timeout(SUBMIT_BLOCK_TIMEOUT, self.sender.send(job_id)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(CoreError::QueueSaturated),
        }
    }

    async fn healthcheck(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// A durable external broker, reached over HTTP. Represents the "real"
/// production transport; any transient failure here is what triggers
/// degradation to [`InProcessBackend`] in [`crate::QueueOrchestrator`].
pub struct BrokerBackend {
    http: reqwest::Client,
    base_url: String,
}

impl BrokerBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl QueueBackend for BrokerBackend {
    async fn submit(&self, job_id: JobId) -> Result<(), CoreError> {
        let response = self
            .http
            .post(self.url("/enqueue"))
            .json(&serde_json::json!({ "job_id": job_id.to_string() }))
            .send()
            .await
            .map_err(|e| CoreError::GeneratorUnreachable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::QueueSaturated)
        }
    }

    async fn healthcheck(&self) -> Result<(), CoreError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| CoreError::GeneratorUnreachable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::GeneratorUnreachable(format!(
                "broker health check returned {}",
                response.status()
            )))
        }
    }

    async fn poll_delivery(&self) -> Result<Option<JobId>, CoreError> {
        #[derive(Deserialize)]
        struct DequeueResponse {
            job_id: String,
        }

        let response = self
            .http
            .get(self.url("/dequeue"))
            .send()
            .await
            .map_err(|e| CoreError::GeneratorUnreachable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CoreError::GeneratorUnreachable(format!(
                "broker dequeue returned {}",
                response.status()
            )));
        }

        let body: DequeueResponse = response
            .json()
            .await
            .map_err(|e| CoreError::GeneratorUnreachable(e.to_string()))?;
        Ok(Some(JobId::from_string(body.job_id)))
    }
}
