//! Process-wide cooldown shared by every bucket processor.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Shared deadline that gates the next dispatch of every bucket.
///
/// Set by whichever processor classifies a failure as a platform-wide rate
/// limit. Tripping only ever extends the deadline, so a short hint from one
/// bucket cannot cut short a longer pause requested by another.
#[derive(Debug, Default)]
pub struct GlobalCooldown {
    deadline: Mutex<Option<Instant>>,
}

impl GlobalCooldown {
    /// Create an inactive cooldown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause all buckets for at least `duration` from now.
    pub fn trip(&self, duration: Duration) -> Instant {
        let candidate = Instant::now() + duration;
        let mut deadline = self.deadline.lock();
        let next = match *deadline {
            Some(current) if current >= candidate => current,
            _ => candidate,
        };
        *deadline = Some(next);
        next
    }

    /// Time left until the deadline, or `None` when inactive or elapsed.
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = (*self.deadline.lock())?;
        let now = Instant::now();
        (deadline > now).then(|| deadline - now)
    }

    /// Whether dispatches are currently paused.
    pub fn is_active(&self) -> bool {
        self.remaining().is_some()
    }

    /// Clear the flag once its deadline has passed. A deadline extended by
    /// another bucket in the meantime is kept.
    pub fn clear_if_elapsed(&self) -> bool {
        let mut deadline = self.deadline.lock();
        match *deadline {
            Some(at) if at <= Instant::now() => {
                *deadline = None;
                true
            }
            _ => false,
        }
    }
}
