use super::*;

#[test]
fn only_terminal_states_report_terminal() {
    assert!(!CanonicalStatus::Queued.is_terminal());
    assert!(!CanonicalStatus::Processing.is_terminal());
    assert!(CanonicalStatus::Completed.is_terminal());
    assert!(CanonicalStatus::Failed.is_terminal());
    assert!(CanonicalStatus::Canceled.is_terminal());
}

#[test]
fn display_matches_wire_vocabulary() {
    assert_eq!(CanonicalStatus::Queued.to_string(), "queued");
    assert_eq!(CanonicalStatus::Processing.to_string(), "processing");
    assert_eq!(CanonicalStatus::Completed.to_string(), "completed");
    assert_eq!(CanonicalStatus::Failed.to_string(), "failed");
    assert_eq!(CanonicalStatus::Canceled.to_string(), "canceled");
}

#[test]
fn serializes_snake_case() {
    let v = serde_json::to_value(CanonicalStatus::Processing).unwrap();
    assert_eq!(v, serde_json::json!("processing"));
}
