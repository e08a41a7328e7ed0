//! Process-wide circuit breaker guarding admission.
//!
//! The breaker opens when `failure_threshold` terminal failures land inside a
//! sliding `failure_window`, across all buckets. While open, every admission
//! is refused. Once `reset_after` has elapsed the next admission check closes
//! it again and starts a fresh tally.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Admitting work.
    Closed,
    /// Rejecting all new work until the reset window passes.
    Open,
}

#[derive(Debug)]
struct BreakerState {
    opened_at: Option<Instant>,
    failures: VecDeque<Instant>,
}

/// Sliding-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    failure_window: Duration,
    reset_after: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(failure_threshold: u32, failure_window: Duration, reset_after: Duration) -> Self {
        Self {
            failure_threshold,
            failure_window,
            reset_after,
            state: Mutex::new(BreakerState {
                opened_at: None,
                failures: VecDeque::new(),
            }),
        }
    }

    /// Admission check. Closes an open breaker whose reset window elapsed.
    ///
    /// Returns the time left until the breaker admits again when open.
    pub fn check(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let Some(opened_at) = state.opened_at else {
            return Ok(());
        };
        let elapsed = opened_at.elapsed();
        if elapsed >= self.reset_after {
            state.opened_at = None;
            state.failures.clear();
            info!(open_for_ms = elapsed.as_millis(), "circuit breaker closed after reset window");
            return Ok(());
        }
        Err(self.reset_after - elapsed)
    }

    /// Record a terminal failure. Returns `true` if this failure opened the breaker.
    pub fn record_failure(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.opened_at.is_some() {
            return false;
        }

        state.failures.push_back(now);
        while let Some(&oldest) = state.failures.front() {
            if now.duration_since(oldest) > self.failure_window {
                state.failures.pop_front();
            } else {
                break;
            }
        }

        if state.failures.len() >= self.failure_threshold as usize {
            state.opened_at = Some(now);
            state.failures.clear();
            warn!(
                threshold = self.failure_threshold,
                window_ms = self.failure_window.as_millis(),
                reset_ms = self.reset_after.as_millis(),
                "circuit breaker opened"
            );
            return true;
        }
        false
    }

    /// Current state without side effects. An open breaker past its reset
    /// window still reports `Open` until the next admission check.
    pub fn state(&self) -> CircuitState {
        if self.state.lock().opened_at.is_some() {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// Failures counted in the current window.
    pub fn recent_failures(&self) -> usize {
        self.state.lock().failures.len()
    }

    /// Force the breaker closed and clear the tally.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.opened_at = None;
        state.failures.clear();
    }
}
