use super::*;

#[test]
fn builder_produces_default_weight_one() {
    let adapter = Adapter::builder().name("my-lora").build();
    assert_eq!(adapter.weight, Adapter::default_weight());
    assert!(adapter.active);
    assert_eq!(adapter.name, "my-lora");
}

#[test]
fn ids_are_distinct_and_prefixed() {
    let a = Adapter::builder().build();
    let b = Adapter::builder().build();
    assert_ne!(a.id, b.id);
    assert!(a.id.as_str().starts_with("adp-"));
}

#[test]
fn trigger_words_round_trip_through_json() {
    let adapter = Adapter::builder()
        .trigger_words(vec!["foo".to_string(), "bar".to_string()])
        .build();
    let json = serde_json::to_string(&adapter).unwrap();
    let back: Adapter = serde_json::from_str(&json).unwrap();
    assert_eq!(back.trigger_words, vec!["foo", "bar"]);
}
