//! Jitter and capped exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Uniform random jitter in `[0, max]`. Returns zero when `max` is zero.
pub fn jitter(max: Duration) -> Duration {
    let ceiling = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if ceiling == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ceiling))
}

/// Exponential delay for the given retry number (1-based), capped at `max`.
///
/// Retry 1 waits `base`, retry 2 waits `2 * base`, and so on.
pub fn exponential(base: Duration, max: Duration, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(31);
    base.checked_mul(1_u32 << exponent).map_or(max, |d| d.min(max))
}

/// Backoff schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    jitter: Duration,
}

impl BackoffPolicy {
    /// Create a policy from base delay, cap and jitter ceiling.
    pub const fn new(base: Duration, max: Duration, jitter: Duration) -> Self {
        Self { base, max, jitter }
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// The result never exceeds the cap and is never shorter than `previous`,
    /// so successive delays for one task are non-decreasing even with jitter.
    pub fn delay(&self, retry: u32, previous: Duration) -> Duration {
        let raw = exponential(self.base, self.max, retry) + jitter(self.jitter);
        raw.min(self.max).max(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);
        assert_eq!(exponential(base, max, 1), Duration::from_millis(100));
        assert_eq!(exponential(base, max, 2), Duration::from_millis(200));
        assert_eq!(exponential(base, max, 4), Duration::from_millis(800));
        assert_eq!(exponential(base, max, 5), max);
        assert_eq!(exponential(base, max, 200), max);
    }

    #[test]
    fn jitter_stays_under_ceiling() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..200 {
            assert!(jitter(Duration::from_millis(20)) <= Duration::from_millis(20));
        }
    }

    #[test]
    fn policy_is_non_decreasing_and_capped() {
        let policy = BackoffPolicy::new(
            Duration::from_millis(10),
            Duration::from_millis(300),
            Duration::from_millis(50),
        );
        let mut previous = Duration::ZERO;
        for retry in 1..=12 {
            let delay = policy.delay(retry, previous);
            assert!(delay >= previous, "retry {retry}: {delay:?} < {previous:?}");
            assert!(delay <= Duration::from_millis(300));
            previous = delay;
        }
        assert_eq!(previous, Duration::from_millis(300));
    }
}
