//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Per-bucket snapshot returned by `Scheduler::bucket_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    /// Tasks queued, including the one currently executing.
    pub queue_size: usize,
    /// Consecutive failed attempts since the last success.
    pub consecutive_errors: u32,
    /// Whether a processor is currently draining the bucket.
    pub processing: bool,
}

/// Process-wide totals since the scheduler was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Submissions received, admitted or not.
    pub submitted: u64,
    /// Tasks that resolved successfully.
    pub completed: u64,
    /// Tasks rejected with the operation's terminal error.
    pub failed: u64,
    /// Tasks rejected because they aged out in the queue.
    pub timed_out: u64,
    /// Submissions refused at admission (queue full or circuit open).
    pub rejected: u64,
    /// Attempts that hit a rate limit.
    pub rate_limited: u64,
    /// Retries scheduled after transient failures.
    pub retried: u64,
}

/// Lock-free counters behind [`SchedulerStats`].
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub rejected: AtomicU64,
    pub rate_limited: AtomicU64,
    pub retried: AtomicU64,
}

impl SchedulerCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }
}
