use loraflow_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {0} already exists")]
    AlreadyExists(String),

    #[error("invalid transition for job {job_id}: {reason}")]
    InvalidTransition { job_id: String, reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound(id),
            StoreError::InvalidTransition { job_id, reason } => {
                CoreError::InvalidTransition(format!("{job_id}: {reason}"))
            }
            StoreError::AlreadyExists(id) => {
                CoreError::InvalidTransition(format!("job {id} already exists"))
            }
            StoreError::Snapshot(msg) => CoreError::InvalidTransition(msg),
        }
    }
}
