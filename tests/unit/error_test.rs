//! Tests for error types

use std::time::Duration;

use prometheus_request_queue::core::{BuildError, SchedulerError};

type Error = SchedulerError<String>;

#[test]
fn test_queue_full_error() {
    let err = Error::QueueFull {
        key: "perms:1".to_string(),
        capacity: 100,
    };
    assert_eq!(format!("{err}"), "queue full for `perms:1` (capacity 100)");
    assert!(err.is_admission());
}

#[test]
fn test_timeout_error() {
    let err = Error::Timeout {
        key: "perms:1".to_string(),
        waited: Duration::from_secs(60),
    };
    assert_eq!(format!("{err}"), "task in `perms:1` timed out after 60s in queue");
    assert!(!err.is_admission());
}

#[test]
fn test_circuit_open_error() {
    let err = Error::CircuitOpen {
        retry_in: Duration::from_millis(1500),
    };
    assert_eq!(format!("{err}"), "circuit breaker open, retry in 1.5s");
    assert!(err.is_admission());
}

#[test]
fn test_operation_error_is_preserved() {
    let err = Error::Operation("missing permission".to_string());
    assert_eq!(format!("{err}"), "operation failed: missing permission");
    assert_eq!(err.operation_error().map(String::as_str), Some("missing permission"));
    assert_eq!(err.into_operation_error(), Some("missing permission".to_string()));
}

#[test]
fn test_non_operation_errors_carry_no_inner_error() {
    assert_eq!(Error::Abandoned.operation_error(), None);
    assert_eq!(format!("{}", Error::Abandoned), "task abandoned before completion");
}

#[test]
fn test_invalid_config_error() {
    let err = BuildError::InvalidConfig("max_queue_size must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: max_queue_size must be greater than 0"
    );
}
