use crate::error::GeneratorError;
use async_trait::async_trait;
use loraflow_core::GenerationParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Opaque handle the generator assigns to an in-flight generation. The
/// coordinator never interprets this string; it only threads it back into
/// `poll`/`cancel` calls.
pub type GenerationHandle = String;

/// Everything needed to start one generation (spec §4.B).
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub params: GenerationParams,
}

/// External status vocabulary, as reported by the generator before
/// normalization (spec §4.C). Field names match the generator's wire
/// format, not our canonical one.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationStatus {
    pub state: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The seam the worker depends on. A real HTTP-backed [`GeneratorClient`]
/// implements this in production; tests inject a fake.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn start(&self, request: GenerationRequest) -> Result<GenerationHandle, GeneratorError>;
    async fn poll(&self, handle: &GenerationHandle) -> Result<GenerationStatus, GeneratorError>;
    async fn cancel(&self, handle: &GenerationHandle) -> Result<(), GeneratorError>;
    async fn healthcheck(&self) -> Result<(), GeneratorError>;
}

const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_CAP: Duration = Duration::from_secs(10);
const RETRY_MAX_ATTEMPTS: u32 = 6;

/// HTTP client for the external generator (spec §4.B).
///
/// Transient failures (connection errors, 5xx) are retried with exponential
/// backoff — 500ms base, factor 2, capped at 10s, up to 6 attempts — before
/// surfacing [`GeneratorError::Unreachable`]. A 4xx response is never
/// retried; it means the generator understood and rejected the request.
pub struct GeneratorClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeneratorClient {
    #[allow(clippy::expect_used)]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn with_retry<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, GeneratorError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GeneratorError>>,
    {
        let mut delay = RETRY_BASE;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(GeneratorError::Unreachable(msg)) if attempt < RETRY_MAX_ATTEMPTS => {
                    warn!(op = op_name, attempt, %msg, "generator request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_CAP);
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn classify_transport_error(err: reqwest::Error) -> GeneratorError {
        if err.is_timeout() {
            GeneratorError::Timeout
        } else {
            GeneratorError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for GeneratorClient {
    async fn start(&self, request: GenerationRequest) -> Result<GenerationHandle, GeneratorError> {
        self.with_retry("start", || async {
            let response = self
                .http
                .post(self.url("/generate"))
                .json(&request)
                .send()
                .await
                .map_err(Self::classify_transport_error)?;

            if response.status().is_client_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Rejected(body));
            }
            if response.status().is_server_error() {
                return Err(GeneratorError::Unreachable(format!(
                    "server error: {}",
                    response.status()
                )));
            }

            #[derive(Deserialize)]
            struct StartResponse {
                handle: String,
            }
            let parsed: StartResponse = response
                .json()
                .await
                .map_err(|e| GeneratorError::Protocol(e.to_string()))?;
            Ok(parsed.handle)
        })
        .await
    }

    async fn poll(&self, handle: &GenerationHandle) -> Result<GenerationStatus, GeneratorError> {
        self.with_retry("poll", || async {
            let response = self
                .http
                .get(self.url(&format!("/generate/{handle}")))
                .send()
                .await
                .map_err(Self::classify_transport_error)?;

            if response.status().is_client_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Rejected(body));
            }
            if response.status().is_server_error() {
                return Err(GeneratorError::Unreachable(format!(
                    "server error: {}",
                    response.status()
                )));
            }

            response
                .json::<GenerationStatus>()
                .await
                .map_err(|e| GeneratorError::Protocol(e.to_string()))
        })
        .await
    }

    async fn cancel(&self, handle: &GenerationHandle) -> Result<(), GeneratorError> {
        self.with_retry("cancel", || async {
            let response = self
                .http
                .post(self.url(&format!("/generate/{handle}/cancel")))
                .send()
                .await
                .map_err(Self::classify_transport_error)?;

            if response.status().is_client_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Rejected(body));
            }
            if response.status().is_server_error() {
                return Err(GeneratorError::Unreachable(format!(
                    "server error: {}",
                    response.status()
                )));
            }
            Ok(())
        })
        .await
    }

    async fn healthcheck(&self) -> Result<(), GeneratorError> {
        // Not retried: the queue orchestrator calls this on its own cadence
        // and interprets a single failure as "degraded", so retrying here
        // would just hide the signal it needs (spec §4.D).
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(Self::classify_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(GeneratorError::Unreachable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
