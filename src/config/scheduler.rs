//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix for environment overrides read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "REQUEST_QUEUE_";

/// Tunables for pacing, retry, cooldown, admission and circuit breaking.
///
/// Durations are stored in milliseconds so the struct maps one-to-one onto
/// JSON and environment variables; code reads them through the `Duration`
/// accessors such as [`SchedulerConfig::min_delay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum delay between two dispatches of the same bucket.
    pub min_delay_ms: u64,
    /// Retries allowed for transient failures before the task fails.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per retry.
    pub base_backoff_ms: u64,
    /// Upper bound for a single backoff sleep.
    pub max_backoff_ms: u64,
    /// Global cooldown applied when a platform-wide limit carries no hint.
    /// Also used for lane-local limits without a hint.
    pub global_cooldown_ms: u64,
    /// Ceiling for the random jitter added to every sleep.
    pub max_jitter_ms: u64,
    /// Maximum time a task may wait in its queue before it is rejected.
    pub queue_timeout_ms: u64,
    /// Consecutive errors after which a bucket slows its pacing.
    pub error_threshold: u32,
    /// Pacing multiplier applied once `error_threshold` is reached.
    pub slowdown_multiplier: u32,
    /// Maximum tasks per bucket, including the one being executed.
    pub max_queue_size: usize,
    /// Terminal failures within the window that open the circuit breaker.
    pub circuit_failure_threshold: u32,
    /// Sliding window over which terminal failures are counted.
    pub circuit_failure_window_ms: u64,
    /// How long the breaker stays open before admitting again.
    pub circuit_reset_ms: u64,
    /// Idle time after which an empty bucket may be evicted. `None` keeps
    /// buckets for the lifetime of the scheduler.
    pub idle_bucket_ttl_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 250,
            max_retries: 3,
            base_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            global_cooldown_ms: 5_000,
            max_jitter_ms: 250,
            queue_timeout_ms: 60_000,
            error_threshold: 3,
            slowdown_multiplier: 2,
            max_queue_size: 100,
            circuit_failure_threshold: 10,
            circuit_failure_window_ms: 60_000,
            circuit_reset_ms: 30_000,
            idle_bucket_ttl_ms: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum inter-request delay.
    #[must_use]
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay_ms = millis(delay);
        self
    }

    /// Set the retry budget for transient failures.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set base and maximum backoff.
    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff_ms = millis(base);
        self.max_backoff_ms = millis(max);
        self
    }

    /// Set the default global cooldown.
    #[must_use]
    pub fn with_global_cooldown(mut self, cooldown: Duration) -> Self {
        self.global_cooldown_ms = millis(cooldown);
        self
    }

    /// Set the jitter ceiling. Zero disables jitter.
    #[must_use]
    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter_ms = millis(jitter);
        self
    }

    /// Set the queue-entry timeout.
    #[must_use]
    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout_ms = millis(timeout);
        self
    }

    /// Set the slowdown threshold and multiplier.
    #[must_use]
    pub const fn with_slowdown(mut self, error_threshold: u32, multiplier: u32) -> Self {
        self.error_threshold = error_threshold;
        self.slowdown_multiplier = multiplier;
        self
    }

    /// Set the per-bucket capacity.
    #[must_use]
    pub const fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set the circuit breaker trigger and reset window.
    #[must_use]
    pub fn with_circuit_breaker(mut self, threshold: u32, window: Duration, reset: Duration) -> Self {
        self.circuit_failure_threshold = threshold;
        self.circuit_failure_window_ms = millis(window);
        self.circuit_reset_ms = millis(reset);
        self
    }

    /// Enable eviction of idle, empty buckets.
    #[must_use]
    pub fn with_idle_bucket_ttl(mut self, ttl: Duration) -> Self {
        self.idle_bucket_ttl_ms = Some(millis(ttl));
        self
    }

    /// Minimum inter-request delay.
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Backoff before the first retry.
    pub const fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    /// Backoff ceiling.
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Default global cooldown.
    pub const fn global_cooldown(&self) -> Duration {
        Duration::from_millis(self.global_cooldown_ms)
    }

    /// Jitter ceiling.
    pub const fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }

    /// Queue-entry timeout.
    pub const fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    /// Circuit breaker counting window.
    pub const fn circuit_failure_window(&self) -> Duration {
        Duration::from_millis(self.circuit_failure_window_ms)
    }

    /// Circuit breaker reset window.
    pub const fn circuit_reset(&self) -> Duration {
        Duration::from_millis(self.circuit_reset_ms)
    }

    /// Idle bucket TTL, if eviction is enabled.
    pub fn idle_bucket_ttl(&self) -> Option<Duration> {
        self.idle_bucket_ttl_ms.map(Duration::from_millis)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first field with an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".into());
        }
        if self.queue_timeout_ms == 0 {
            return Err("queue_timeout_ms must be greater than 0".into());
        }
        if self.max_backoff_ms < self.base_backoff_ms {
            return Err("max_backoff_ms must be at least base_backoff_ms".into());
        }
        if self.slowdown_multiplier == 0 {
            return Err("slowdown_multiplier must be greater than 0".into());
        }
        if self.circuit_failure_threshold == 0 {
            return Err("circuit_failure_threshold must be greater than 0".into());
        }
        if self.circuit_failure_window_ms == 0 {
            return Err("circuit_failure_window_ms must be greater than 0".into());
        }
        if self.circuit_reset_ms == 0 {
            return Err("circuit_reset_ms must be greater than 0".into());
        }
        if self.idle_bucket_ttl_ms == Some(0) {
            return Err("idle_bucket_ttl_ms must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or failed validation.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file is loaded first if present. Each field can be overridden
    /// by `REQUEST_QUEUE_<FIELD>` in upper case, e.g.
    /// `REQUEST_QUEUE_MIN_DELAY_MS=100`. Unset fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message on an unparsable variable or failed validation.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `REQUEST_QUEUE_` naming scheme.
    ///
    /// # Errors
    ///
    /// Returns a message naming the field whose value does not parse, or the
    /// validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |field: &str| lookup(&format!("{ENV_PREFIX}{}", field.to_uppercase()));

        override_field(&get, "min_delay_ms", &mut cfg.min_delay_ms)?;
        override_field(&get, "max_retries", &mut cfg.max_retries)?;
        override_field(&get, "base_backoff_ms", &mut cfg.base_backoff_ms)?;
        override_field(&get, "max_backoff_ms", &mut cfg.max_backoff_ms)?;
        override_field(&get, "global_cooldown_ms", &mut cfg.global_cooldown_ms)?;
        override_field(&get, "max_jitter_ms", &mut cfg.max_jitter_ms)?;
        override_field(&get, "queue_timeout_ms", &mut cfg.queue_timeout_ms)?;
        override_field(&get, "error_threshold", &mut cfg.error_threshold)?;
        override_field(&get, "slowdown_multiplier", &mut cfg.slowdown_multiplier)?;
        override_field(&get, "max_queue_size", &mut cfg.max_queue_size)?;
        override_field(&get, "circuit_failure_threshold", &mut cfg.circuit_failure_threshold)?;
        override_field(&get, "circuit_failure_window_ms", &mut cfg.circuit_failure_window_ms)?;
        override_field(&get, "circuit_reset_ms", &mut cfg.circuit_reset_ms)?;
        if let Some(raw) = get("idle_bucket_ttl_ms") {
            let ttl = raw
                .trim()
                .parse()
                .map_err(|e| format!("idle_bucket_ttl_ms: invalid value `{raw}`: {e}"))?;
            cfg.idle_bucket_ttl_ms = Some(ttl);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn override_field<T, G>(get: &G, field: &str, slot: &mut T) -> Result<(), String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(field) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| format!("{field}: invalid value `{raw}`: {e}"))?;
    }
    Ok(())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
