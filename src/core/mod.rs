//! Core scheduling: buckets, processors, cooldown and circuit breaking.

pub mod backoff;
mod bucket;
pub mod circuit_breaker;
pub mod classify;
pub mod cooldown;
pub mod error;
mod processor;
pub mod scheduler;
pub mod stats;
mod task;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use classify::{Classify, ErrorClass, RateLimitScope};
pub use cooldown::GlobalCooldown;
pub use error::{BuildError, SchedulerError};
pub use scheduler::{Scheduler, Spawn, Submission};
pub use stats::{BucketStats, SchedulerStats};
pub use task::TaskHandle;
