//! The shared error taxonomy (spec §7).
//!
//! Every failure mode named in the specification gets exactly one variant
//! here. Crates that need a richer, crate-local error type (e.g. the
//! generator client's transport errors) define their own enum and convert
//! into `CoreError` at the boundary where the failure becomes either
//! caller-visible (coordinator/server) or a terminal job state (worker).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Request rejected before job creation; surfaced to the caller.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Referenced adapter missing; caller-visible.
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    /// Could not enqueue; caller-visible, retry-safe.
    #[error("queue saturated")]
    QueueSaturated,

    /// Transient external outage, already retried internally before
    /// becoming terminal.
    #[error("generator unreachable: {0}")]
    GeneratorUnreachable(String),

    /// External generator explicitly refused the job.
    #[error("generator rejected job: {0}")]
    GeneratorRejected(String),

    /// Exceeded `max_job_duration`.
    #[error("job exceeded maximum duration")]
    Timeout,

    /// User- or admin-initiated cancellation.
    #[error("job canceled")]
    Canceled,

    /// Internal bug guard. Never surfaced to callers directly; the server
    /// maps this to an opaque 500.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    /// WebSocket-only: closes the connection, does not fail the job.
    #[error("slow consumer")]
    SlowConsumer,

    /// Requested job/entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// The stable machine-readable error kind, as referenced by spec §7
    /// and stored in `Job::result.error_kind` for terminal failures.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidParameters(_) => "invalid_parameters",
            CoreError::UnknownAdapter(_) => "unknown_adapter",
            CoreError::QueueSaturated => "queue_saturated",
            CoreError::GeneratorUnreachable(_) => "generator_unreachable",
            CoreError::GeneratorRejected(_) => "generator_rejected",
            CoreError::Timeout => "timeout",
            CoreError::Canceled => "canceled",
            CoreError::InvalidTransition(_) => "invalid_transition",
            CoreError::SlowConsumer => "slow_consumer",
            CoreError::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
