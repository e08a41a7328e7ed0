//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_request_queue::config::{SchedulerConfig, ENV_PREFIX};

#[test]
fn test_default_config_is_valid() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.min_delay(), Duration::from_millis(250));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.max_queue_size, 100);
    assert_eq!(config.idle_bucket_ttl(), None);
}

#[test]
fn test_zero_queue_size_is_rejected() {
    let config = SchedulerConfig::new().with_max_queue_size(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_queue_timeout_is_rejected() {
    let config = SchedulerConfig::new().with_queue_timeout(Duration::ZERO);
    assert!(config.validate().is_err());
}

#[test]
fn test_backoff_cap_below_base_is_rejected() {
    let config = SchedulerConfig::new().with_backoff(Duration::from_secs(2), Duration::from_secs(1));
    let err = config.validate().unwrap_err();
    assert!(err.contains("max_backoff_ms"));
}

#[test]
fn test_zero_slowdown_multiplier_is_rejected() {
    let config = SchedulerConfig::new().with_slowdown(3, 0);
    assert!(config.validate().is_err());
}

#[test]
fn test_circuit_breaker_settings_must_be_positive() {
    let base = SchedulerConfig::new();
    let window = Duration::from_secs(60);
    let reset = Duration::from_secs(30);

    assert!(base.clone().with_circuit_breaker(0, window, reset).validate().is_err());
    assert!(base.clone().with_circuit_breaker(5, Duration::ZERO, reset).validate().is_err());
    assert!(base.clone().with_circuit_breaker(5, window, Duration::ZERO).validate().is_err());
    assert!(base.with_circuit_breaker(5, window, reset).validate().is_ok());
}

#[test]
fn test_zero_idle_ttl_is_rejected() {
    let mut config = SchedulerConfig::new();
    config.idle_bucket_ttl_ms = Some(0);
    assert!(config.validate().is_err());

    let config = SchedulerConfig::new().with_idle_bucket_ttl(Duration::from_secs(300));
    assert!(config.validate().is_ok());
    assert_eq!(config.idle_bucket_ttl(), Some(Duration::from_secs(300)));
}

#[test]
fn test_json_fills_missing_fields_with_defaults() {
    let config = SchedulerConfig::from_json_str(r#"{"min_delay_ms": 40, "max_retries": 7}"#).unwrap();
    assert_eq!(config.min_delay(), Duration::from_millis(40));
    assert_eq!(config.max_retries, 7);
    assert_eq!(config.global_cooldown(), Duration::from_secs(5));
}

#[test]
fn test_json_round_trip() {
    let config = SchedulerConfig::new()
        .with_max_jitter(Duration::from_millis(10))
        .with_idle_bucket_ttl(Duration::from_secs(60));
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_invalid_json_is_rejected() {
    let err = SchedulerConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));

    let err = SchedulerConfig::from_json_str(r#"{"max_queue_size": 0}"#).unwrap_err();
    assert!(err.contains("max_queue_size"));
}

#[test]
fn test_lookup_uses_prefixed_upper_case_names() {
    let vars: HashMap<String, String> = [
        (format!("{ENV_PREFIX}MIN_DELAY_MS"), "75".to_string()),
        (format!("{ENV_PREFIX}IDLE_BUCKET_TTL_MS"), " 1000 ".to_string()),
    ]
    .into_iter()
    .collect();

    let config = SchedulerConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();
    assert_eq!(config.min_delay(), Duration::from_millis(75));
    assert_eq!(config.idle_bucket_ttl(), Some(Duration::from_secs(1)));
    assert_eq!(config.max_retries, 3);
}

#[test]
fn test_lookup_validates_result() {
    let config = SchedulerConfig::from_lookup(|name| {
        (name == "REQUEST_QUEUE_MAX_QUEUE_SIZE").then(|| "0".to_string())
    });
    assert!(config.is_err());
}
