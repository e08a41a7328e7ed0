//! Tests for utility functions

use prometheus_request_queue::util::{init_tracing, Priority};

#[test]
fn test_priority_ordering() {
    // Lower sorts first: more urgent.
    assert!(Priority::Immediate < Priority::High);
    assert!(Priority::High < Priority::Normal);
    assert!(Priority::Normal < Priority::Low);
}

#[test]
fn test_priority_default() {
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_only_immediate_runs_inline() {
    assert!(Priority::Immediate.is_inline());
    assert!(!Priority::High.is_inline());
    assert!(!Priority::Low.is_inline());
}

#[test]
fn test_priority_serde_names() {
    assert_eq!(serde_json::to_string(&Priority::Immediate).unwrap(), "\"immediate\"");
    let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(parsed, Priority::Low);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
