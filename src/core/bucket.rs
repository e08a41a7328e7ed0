//! Resource lanes: one ordered queue plus pacing and error state per key.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::core::stats::BucketStats;
use crate::core::task::QueuedTask;

/// Result of offering a task to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Enqueued and the bucket was idle: the caller must start a processor.
    StartProcessor,
    /// Enqueued behind an active processor.
    Queued,
    /// Bucket at capacity; the task was dropped.
    Full {
        /// Depth at rejection time.
        depth: usize,
    },
}

/// Mutable lane state. Only touched under the bucket mutex and never held
/// across an `.await`.
pub(crate) struct BucketState {
    /// Pending tasks ordered by `(priority, enqueued_at, seq)`.
    pub queue: VecDeque<QueuedTask>,
    /// The processor holds the head task outside the queue while executing
    /// or backing off. It still counts toward depth.
    pub in_flight: bool,
    /// At most one processor per bucket.
    pub processing: bool,
    pub last_dispatch: Option<Instant>,
    /// Lane-local rate-limit deadline.
    pub retry_after: Option<Instant>,
    pub consecutive_errors: u32,
    pub last_active: Instant,
}

impl BucketState {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: false,
            processing: false,
            last_dispatch: None,
            retry_after: None,
            consecutive_errors: 0,
            last_active: Instant::now(),
        }
    }

    pub fn depth(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight)
    }

    pub fn insert(&mut self, task: QueuedTask) {
        let key = task.order_key();
        let idx = self.queue.partition_point(|queued| queued.order_key() <= key);
        self.queue.insert(idx, task);
    }

    /// Remove every queued task older than `timeout`, preserving order of
    /// the rest. The in-flight task is not subject to the sweep.
    pub fn sweep_expired(&mut self, now: Instant, timeout: Duration) -> Vec<QueuedTask> {
        let expired = |task: &QueuedTask| now.duration_since(task.enqueued_at) > timeout;
        if !self.queue.iter().any(expired) {
            return Vec::new();
        }
        let (expired, kept): (Vec<_>, Vec<_>) = self.queue.drain(..).partition(expired);
        self.queue = kept.into();
        expired
    }

    /// Take the most urgent task for execution.
    pub fn take_head(&mut self) -> Option<QueuedTask> {
        let task = self.queue.pop_front()?;
        self.in_flight = true;
        Some(task)
    }

    /// Put a task back after a rate limit or transient failure.
    pub fn requeue(&mut self, task: QueuedTask) {
        self.in_flight = false;
        self.insert(task);
    }

    /// The in-flight task left the bucket for good.
    pub fn settle(&mut self) {
        self.in_flight = false;
        self.last_active = Instant::now();
    }

    /// Clear the processing flag if nothing is left. Returns `true` when the
    /// processor should exit.
    pub fn finish_if_idle(&mut self) -> bool {
        if self.queue.is_empty() && !self.in_flight {
            self.processing = false;
            self.last_active = Instant::now();
            return true;
        }
        false
    }
}

/// One resource lane.
pub(crate) struct Bucket {
    key: String,
    state: Mutex<BucketState>,
}

impl Bucket {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(BucketState::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock()
    }

    /// Enqueue `task` unless the bucket already holds `capacity` tasks.
    pub fn admit(&self, task: QueuedTask, capacity: usize) -> Admission {
        let mut state = self.state.lock();
        let depth = state.depth();
        if depth >= capacity {
            return Admission::Full { depth };
        }
        state.insert(task);
        state.last_active = Instant::now();
        if state.processing {
            Admission::Queued
        } else {
            state.processing = true;
            Admission::StartProcessor
        }
    }

    pub fn depth(&self) -> usize {
        self.state.lock().depth()
    }

    pub fn stats(&self) -> BucketStats {
        let state = self.state.lock();
        BucketStats {
            queue_size: state.depth(),
            consecutive_errors: state.consecutive_errors,
            processing: state.processing,
        }
    }

    /// Idle, empty and untouched for at least `ttl`.
    pub fn is_evictable(&self, now: Instant, ttl: Duration) -> bool {
        let state = self.state.lock();
        !state.processing && state.depth() == 0 && now.duration_since(state.last_active) >= ttl
    }
}
