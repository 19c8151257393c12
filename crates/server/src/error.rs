//! Maps [`CoreError`] onto HTTP responses (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use loraflow_core::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A route-level decision to surface an otherwise-internal transition
    /// conflict to the caller (e.g. canceling an already-terminal job),
    /// where the message itself is safe and useful to return.
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Core(err) => match err {
                CoreError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
                CoreError::UnknownAdapter(_) => StatusCode::BAD_REQUEST,
                CoreError::QueueSaturated => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::GeneratorUnreachable(_) => StatusCode::BAD_GATEWAY,
                CoreError::GeneratorRejected(_) => StatusCode::BAD_GATEWAY,
                CoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                CoreError::Canceled => StatusCode::CONFLICT,
                // Internal bug guard; never explained to the caller (spec §7).
                CoreError::InvalidTransition(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CoreError::SlowConsumer => StatusCode::INTERNAL_SERVER_ERROR,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Conflict(_) => "invalid_transition",
            ApiError::Core(err) => err.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Conflict(reason) => reason.clone(),
            ApiError::Core(CoreError::InvalidTransition(_)) => "internal error".to_string(),
            ApiError::Core(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": { "kind": self.kind(), "message": self.message() } }));
        (status, body).into_response()
    }
}
