//! Status Normalizer (spec §4.C): the one place external generator
//! vocabulary is mapped onto [`CanonicalStatus`]. No other module is allowed
//! to match on `GenerationStatus::state` strings directly.

use crate::client::GenerationStatus;
use loraflow_core::CanonicalStatus;

/// The outcome of normalizing one external status report: the canonical
/// status plus, for unrecognized vocabulary, a diagnostic message to store
/// on the job's terminal result (spec §4.C).
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub status: CanonicalStatus,
    pub progress: f64,
    pub message: Option<String>,
}

/// Map one external status report onto the canonical vocabulary and [0,1]
/// progress (spec §4.C). The mapping is explicit and exhaustive: anything
/// outside the documented vocabulary becomes `Failed` with a diagnostic
/// message rather than being passed through or guessed at. Idempotent:
/// normalizing an already-canonical raw string twice yields the same result
/// (verified by property test).
///
/// `previous_progress` is the last progress value known for this job; it is
/// what a `processing` report with no progress field of its own falls back
/// to, so a generator that omits progress on some polls doesn't make the job
/// appear to regress to 0%.
pub fn normalize(status: &GenerationStatus, previous_progress: f64) -> Normalized {
    let raw = status.state.trim();
    let canonical = match raw.to_ascii_lowercase().as_str() {
        "queued" | "pending" | "waiting" => Some(CanonicalStatus::Queued),
        "processing" | "running" | "in_progress" | "started" => Some(CanonicalStatus::Processing),
        "completed" | "success" | "succeeded" | "ok" | "done" | "finished" => {
            Some(CanonicalStatus::Completed)
        }
        "failed" | "error" | "errored" | "exception" => Some(CanonicalStatus::Failed),
        "canceled" | "cancelled" | "aborted" => Some(CanonicalStatus::Canceled),
        _ => None,
    };

    let (status_out, message) = match canonical {
        Some(status) => (status, None),
        None => (
            CanonicalStatus::Failed,
            Some(format!("unrecognized status: {raw}")),
        ),
    };

    Normalized {
        status: status_out,
        progress: normalize_progress(status.progress, status_out, previous_progress),
        message,
    }
}

/// Progress normalization (spec §4.C): generator-reported percentages
/// (0..=100) are rescaled to [0,1]; values already in [0,1] pass through;
/// a missing value is derived from the canonical status, except while still
/// `processing`, where the previously known progress is left unchanged
/// rather than reset.
fn normalize_progress(raw: Option<f64>, status: CanonicalStatus, previous_progress: f64) -> f64 {
    match raw {
        Some(p) if p > 1.0 && p <= 100.0 => (p / 100.0).clamp(0.0, 1.0),
        Some(p) if (0.0..=1.0).contains(&p) => p,
        Some(p) => p.clamp(0.0, 1.0),
        None => match status {
            CanonicalStatus::Completed => 1.0,
            CanonicalStatus::Queued => 0.0,
            CanonicalStatus::Processing => previous_progress,
            _ => previous_progress,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: &str) -> GenerationStatus {
        GenerationStatus {
            state: state.to_string(),
            progress: None,
            images: Vec::new(),
            error: None,
        }
    }

    fn status_with_progress(state: &str, progress: f64) -> GenerationStatus {
        GenerationStatus {
            state: state.to_string(),
            progress: Some(progress),
            images: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn maps_every_documented_terminal_state() {
        assert_eq!(normalize(&status("succeeded"), 0.0).status, CanonicalStatus::Completed);
        assert_eq!(normalize(&status("ok"), 0.0).status, CanonicalStatus::Completed);
        assert_eq!(normalize(&status("failed"), 0.0).status, CanonicalStatus::Failed);
        assert_eq!(normalize(&status("exception"), 0.0).status, CanonicalStatus::Failed);
        assert_eq!(normalize(&status("cancelled"), 0.0).status, CanonicalStatus::Canceled);
    }

    #[test]
    fn is_case_insensitive_and_trims_whitespace() {
        assert_eq!(normalize(&status("  SUCCEEDED  "), 0.0).status, CanonicalStatus::Completed);
    }

    #[test]
    fn unknown_state_maps_to_failed_with_diagnostic_message() {
        let result = normalize(&status("some_future_state"), 0.0);
        assert_eq!(result.status, CanonicalStatus::Failed);
        assert_eq!(
            result.message.as_deref(),
            Some("unrecognized status: some_future_state")
        );
    }

    #[test]
    fn percentage_progress_is_rescaled() {
        let result = normalize(&status_with_progress("processing", 42.0), 0.0);
        assert!((result.progress - 0.42).abs() < 1e-9);
    }

    #[test]
    fn fractional_progress_passes_through() {
        let result = normalize(&status_with_progress("processing", 0.42), 0.0);
        assert!((result.progress - 0.42).abs() < 1e-9);
    }

    #[test]
    fn missing_progress_derives_from_status() {
        assert_eq!(normalize(&status("completed"), 0.3).progress, 1.0);
        assert_eq!(normalize(&status("queued"), 0.3).progress, 0.0);
    }

    #[test]
    fn missing_progress_while_processing_preserves_previous_value() {
        let result = normalize(&status("processing"), 0.37);
        assert!((result.progress - 0.37).abs() < 1e-9);
    }

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent_over_known_vocabulary(idx in 0..12usize) {
            let states = [
                "queued", "pending", "running", "processing", "succeeded",
                "completed", "ok", "failed", "error", "exception",
                "canceled", "cancelled",
            ];
            let input = status(states[idx]);
            let first = normalize(&input, 0.0);
            let reapplied = status(&first.status.to_string());
            let second = normalize(&reapplied, first.progress);
            prop_assert_eq!(first.status, second.status);
        }
    }
}
