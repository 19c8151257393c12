use loraflow_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator unreachable: {0}")]
    Unreachable(String),

    #[error("generator rejected request: {0}")]
    Rejected(String),

    #[error("generator returned an unparseable response: {0}")]
    Protocol(String),

    #[error("request timed out")]
    Timeout,
}

impl From<GeneratorError> for CoreError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Unreachable(msg) => CoreError::GeneratorUnreachable(msg),
            GeneratorError::Rejected(msg) => CoreError::GeneratorRejected(msg),
            GeneratorError::Protocol(msg) => CoreError::GeneratorUnreachable(msg),
            GeneratorError::Timeout => CoreError::Timeout,
        }
    }
}
