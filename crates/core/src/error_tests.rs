use super::*;

#[test]
fn kind_is_stable_for_every_variant() {
    let cases = [
        (CoreError::InvalidParameters("x".into()), "invalid_parameters"),
        (CoreError::UnknownAdapter("x".into()), "unknown_adapter"),
        (CoreError::QueueSaturated, "queue_saturated"),
        (CoreError::GeneratorUnreachable("x".into()), "generator_unreachable"),
        (CoreError::GeneratorRejected("x".into()), "generator_rejected"),
        (CoreError::Timeout, "timeout"),
        (CoreError::Canceled, "canceled"),
        (CoreError::InvalidTransition("x".into()), "invalid_transition"),
        (CoreError::SlowConsumer, "slow_consumer"),
        (CoreError::NotFound("x".into()), "not_found"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.kind(), expected);
    }
}

#[test]
fn display_includes_context_when_present() {
    let err = CoreError::GeneratorRejected("bad prompt".into());
    assert!(err.to_string().contains("bad prompt"));
}
