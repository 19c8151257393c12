//! Canonical job status (spec §3.2).

use serde::{Deserialize, Serialize};

/// The five states every job passes through. All external vocabulary from
/// the generator is normalized into one of these (see
/// `loraflow_generator::normalize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl CanonicalStatus {
    /// A job is terminal once no further status events can be published for it.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanonicalStatus::Completed | CanonicalStatus::Failed | CanonicalStatus::Canceled
        )
    }
}

crate::simple_display! {
    CanonicalStatus {
        Queued => "queued",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Canceled => "canceled",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
