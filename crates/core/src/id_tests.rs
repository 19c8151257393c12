use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup() {
    let id = TestId::new();
    let mut map = HashMap::new();
    map.insert(id, 42);
    assert_eq!(map.get(id.as_str()), Some(&42));
}

#[test]
fn define_id_round_trips_through_string() {
    let id = TestId::new();
    let parsed = TestId::from_string(id.as_str());
    assert_eq!(id, parsed);
}

#[test]
fn define_id_carries_its_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with(TestId::PREFIX));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn define_id_display_matches_as_str() {
    let id = TestId::new();
    assert_eq!(id.to_string(), id.as_str());
}

#[test]
fn define_id_two_news_are_distinct() {
    assert_ne!(TestId::new(), TestId::new());
}
