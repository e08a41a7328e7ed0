//! Error classification contract for submitted operations.
//!
//! The scheduler never inspects error messages or wire formats. The
//! collaborator wrapping the external dependency implements [`Classify`] for
//! its error type and the processor acts on the returned [`ErrorClass`] only.

use std::time::Duration;

/// Scope of a rate-limit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    /// Platform-wide limit: every bucket must pause.
    Global,
    /// Limit applies only to the resource lane that hit it.
    Lane,
}

/// How the scheduler should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The dependency throttled the call. Not counted against the retry budget.
    RateLimited {
        /// Whether the limit is platform-wide or lane-local.
        scope: RateLimitScope,
        /// Suggested wait before the next attempt, if the dependency sent one.
        retry_after: Option<Duration>,
    },
    /// Server-side or otherwise retryable failure.
    Transient,
    /// Failure that retrying will not fix.
    Permanent,
}

impl ErrorClass {
    /// Platform-wide rate limit with an optional retry hint.
    pub const fn global_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            scope: RateLimitScope::Global,
            retry_after,
        }
    }

    /// Lane-local rate limit with an optional retry hint.
    pub const fn lane_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            scope: RateLimitScope::Lane,
            retry_after,
        }
    }

    /// Whether this class is any kind of rate limit.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Implemented by the error type of every submitted operation.
pub trait Classify {
    /// Classify this failure for retry and cooldown decisions.
    fn classify(&self) -> ErrorClass;
}

impl Classify for ErrorClass {
    fn classify(&self) -> ErrorClass {
        *self
    }
}
