//! Tests for builder modules

use std::time::Duration;

use prometheus_request_queue::builders::SchedulerBuilder;
use prometheus_request_queue::core::{BuildError, CircuitState};
use prometheus_request_queue::runtime::TokioSpawner;

#[test]
fn test_scheduler_builder_defaults() {
    let builder = SchedulerBuilder::new();
    assert_eq!(builder.config().max_queue_size, 100);
    assert_eq!(builder.config().min_delay(), Duration::from_millis(250));
}

#[test]
fn test_configure_applies_fluent_setters() {
    let builder = SchedulerBuilder::new()
        .configure(|c| c.with_min_delay(Duration::from_millis(50)).with_max_retries(5));
    assert_eq!(builder.config().min_delay(), Duration::from_millis(50));
    assert_eq!(builder.config().max_retries, 5);
}

#[test]
fn test_from_json_str() {
    let builder = SchedulerBuilder::from_json_str(r#"{"max_queue_size": 8}"#).unwrap();
    assert_eq!(builder.config().max_queue_size, 8);

    let err = SchedulerBuilder::from_json_str(r#"{"max_queue_size": 0}"#).unwrap_err();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[test]
fn test_build_outside_runtime_fails() {
    let err = SchedulerBuilder::new().build().unwrap_err();
    assert!(matches!(err, BuildError::NoRuntime(_)));
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let err = SchedulerBuilder::new()
        .configure(|c| c.with_max_queue_size(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_build_inside_runtime() {
    let scheduler = SchedulerBuilder::new().build().unwrap();
    assert_eq!(scheduler.bucket_count(), 0);
    assert_eq!(scheduler.total_queue_size(), 0);
    assert_eq!(scheduler.circuit_state(), CircuitState::Closed);
    assert!(!scheduler.is_globally_cooling_down());
}

#[tokio::test]
async fn test_build_with_explicit_spawner() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());
    let scheduler = SchedulerBuilder::new().build_with_spawner(spawner).unwrap();
    let value = scheduler
        .submit("perms:1", prometheus_request_queue::util::Priority::Normal, || async {
            Ok::<_, prometheus_request_queue::core::ErrorClass>(11)
        })
        .await
        .unwrap();
    assert_eq!(value, 11);
}

#[tokio::test]
async fn test_scheduler_debug_shows_config_and_buckets() {
    let scheduler = SchedulerBuilder::new()
        .configure(|c| c.with_max_queue_size(7))
        .build()
        .unwrap();
    let rendered = format!("{scheduler:?}");
    assert!(rendered.starts_with("Scheduler"));
    assert!(rendered.contains("max_queue_size: 7"));
    assert!(rendered.contains("buckets: 0"));
}
