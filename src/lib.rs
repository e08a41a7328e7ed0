//! # Prometheus Request Queue
//!
//! Admission control and pacing for calls to a rate-limited external API.
//!
//! Multi-tenant, event-driven applications tend to fire many short operations
//! ("edit this resource", "rename that one") at the same throttled platform.
//! Calling it concurrently and naively leads to throttling, duplicate retries
//! and cascading failures. This crate sits between those producers and the
//! dependency and decides when each call may go out.
//!
//! ## Key Features
//!
//! - **Per-resource buckets**: one priority queue and one sequential processor per key
//! - **Pacing**: minimum delay between dispatches, slowed down under sustained errors
//! - **Backoff**: capped exponential backoff with jitter for transient failures
//! - **Global cooldown**: a platform-wide rate limit pauses every bucket at once
//! - **Circuit breaker**: refuses new work after a burst of terminal failures
//! - **Backpressure**: bounded queues reject synchronously when full
//!
//! The scheduler never parses error text. Operations return an error type that
//! implements [`core::Classify`], and the processor acts on that classification.
//!
//! ```rust,ignore
//! use prometheus_request_queue::builders::SchedulerBuilder;
//! use prometheus_request_queue::core::{Classify, ErrorClass, Submission};
//! use prometheus_request_queue::util::Priority;
//! use std::time::Duration;
//!
//! let scheduler = SchedulerBuilder::new()
//!     .configure(|c| c.with_min_delay(Duration::from_millis(50)).with_max_retries(5))
//!     .build()?;
//!
//! // Await the outcome.
//! scheduler.submit("perms:123", Priority::Normal, move || api.edit(123)).await?;
//!
//! // Log-only background work.
//! scheduler.fire_and_forget("perms:123", Priority::Low, move || api.audit(123));
//!
//! // Several lanes at once.
//! let results = scheduler
//!     .submit_parallel(ids.iter().map(|id| {
//!         let id = *id;
//!         Submission::new(format!("perms:{id}"), Priority::High, move || api.edit(id))
//!     }))
//!     .await?;
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: buckets, processors, cooldown and circuit breaking.
pub mod core;
/// Configuration models for pacing, retries, admission and circuit breaking.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
