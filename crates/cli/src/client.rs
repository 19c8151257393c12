//! Thin HTTP client for the `loraflowd` control plane (spec §6).
//!
//! Every method here is a direct mapping onto one documented route; none of
//! them retry or interpret failures beyond surfacing the server's error
//! body. `loraflowctl` is an operator convenience over the HTTP API, not a
//! second implementation of the coordinator's validation.

use loraflow_core::Job;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, #[source] source: reqwest::Error },

    #[error("{status}: {kind}: {message}")]
    Api { status: reqwest::StatusCode, kind: String, message: String },

    #[error("malformed response body: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    kind: String,
    message: String,
}

#[derive(Debug, Serialize, Default)]
pub struct GenerateArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub params: GenerateParamsArgs,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapters: Option<Vec<AdapterSelectorArgs>>,
}

#[derive(Debug, Serialize)]
pub struct GenerateParamsArgs {
    pub sampler: String,
    pub steps: u32,
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub batch_size: u32,
}

#[derive(Debug, Serialize)]
pub struct AdapterSelectorArgs {
    pub adapter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_override: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

/// A connected handle to one `loraflowd` instance.
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlPlaneClient {
    #[allow(clippy::expect_used)]
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// The WebSocket URL for `/ws/progress`, derived from the configured
    /// HTTP base (`http(s)://` becomes `ws(s)://`).
    pub fn ws_url(&self, job_id: Option<&str>) -> String {
        let ws_base = self
            .base_url
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1);
        match job_id {
            Some(id) => format!("{}/ws/progress?job_id={id}", ws_base.trim_end_matches('/')),
            None => format!("{}/ws/progress", ws_base.trim_end_matches('/')),
        }
    }

    pub async fn create_job(&self, request: &GenerateArgs) -> Result<Job, ClientError> {
        let response = self
            .http
            .post(self.url("/jobs"))
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: self.url("/jobs"), source })?;
        Self::parse::<Job>(response).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, ClientError> {
        let url = self.url(&format!("/jobs/{id}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        Self::parse::<Job>(response).await
    }

    pub async fn list_jobs(&self, status: Option<&str>, limit: Option<usize>) -> Result<Vec<Job>, ClientError> {
        let mut url = self.url("/jobs");
        let mut query = Vec::new();
        if let Some(status) = status {
            query.push(format!("status={status}"));
        }
        if let Some(limit) = limit {
            query.push(format!("limit={limit}"));
        }
        if !query.is_empty() {
            url = format!("{url}?{}", query.join("&"));
        }
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        Ok(Self::parse::<JobListResponse>(response).await?.jobs)
    }

    pub async fn cancel_job(&self, id: &str) -> Result<Job, ClientError> {
        let url = self.url(&format!("/jobs/{id}/cancel"));
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        Self::parse::<Job>(response).await
    }

    pub async fn recommendations(
        &self,
        kind: &str,
        target: Option<&str>,
        prompt: Option<&str>,
        k: u32,
    ) -> Result<serde_json::Value, ClientError> {
        let mut query = vec![format!("kind={kind}"), format!("k={k}")];
        if let Some(target) = target {
            query.push(format!("target={target}"));
        }
        if let Some(prompt) = prompt {
            query.push(format!("prompt={}", urlencode(prompt)));
        }
        let url = format!("{}?{}", self.url("/recommendations"), query.join("&"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        Self::parse::<serde_json::Value>(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(|e| ClientError::Decode(e.to_string()))?;
            return serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()));
        }
        let bytes = response.bytes().await.unwrap_or_default();
        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => Err(ClientError::Api { status, kind: body.error.kind, message: body.error.message }),
            Err(_) => Err(ClientError::Api {
                status,
                kind: "unknown".to_string(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }
}

/// Minimal query-string escaping sufficient for prompt text; avoids pulling
/// in a full URL crate for one call site.
fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
