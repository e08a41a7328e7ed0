//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the scheduler.
///
/// `E` is the operation's own error type. Rate-limit and transient
/// classifications are absorbed by the processor and never appear here; a
/// caller sees either an admission rejection, a queue timeout, or the
/// operation's terminal error unchanged.
#[derive(Debug, Error)]
pub enum SchedulerError<E> {
    /// Bucket was at capacity at submission time. Nothing was enqueued.
    #[error("queue full for `{key}` (capacity {capacity})")]
    QueueFull {
        /// Bucket key.
        key: String,
        /// Configured per-bucket capacity.
        capacity: usize,
    },
    /// Task aged out while queued; its operation never ran.
    #[error("task in `{key}` timed out after {waited:?} in queue")]
    Timeout {
        /// Bucket key.
        key: String,
        /// Time spent queued.
        waited: Duration,
    },
    /// Circuit breaker was open at submission time.
    #[error("circuit breaker open, retry in {retry_in:?}")]
    CircuitOpen {
        /// Time until the breaker admits again.
        retry_in: Duration,
    },
    /// The operation's terminal error, after retries or when permanent.
    #[error("operation failed: {0}")]
    Operation(E),
    /// The task was dropped without an outcome (runtime shut down).
    #[error("task abandoned before completion")]
    Abandoned,
}

impl<E> SchedulerError<E> {
    /// Whether the error was produced at admission time.
    pub const fn is_admission(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::CircuitOpen { .. })
    }

    /// Borrow the operation's own error, if this is one.
    pub const fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Take the operation's own error, if this is one.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while constructing a scheduler.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No tokio runtime is available to spawn bucket processors on.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
