//! Configuration models for pacing, retries, admission and circuit breaking.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, ENV_PREFIX};
