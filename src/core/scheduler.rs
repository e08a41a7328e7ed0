//! Public scheduler façade and bucket registry.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::backoff::BackoffPolicy;
use crate::core::bucket::{Admission, Bucket};
use crate::core::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::core::cooldown::GlobalCooldown;
use crate::core::processor;
use crate::core::stats::{BucketStats, SchedulerCounters, SchedulerStats};
use crate::core::task::{Call, QueuedTask, TaskHandle};
use crate::core::{BuildError, Classify, SchedulerError};
use crate::runtime::TokioSpawner;
use crate::util::Priority;

/// Abstraction for spawning bucket processors on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// One entry of a [`Scheduler::submit_parallel`] batch.
#[derive(Debug, Clone)]
pub struct Submission<F> {
    /// Bucket key, e.g. `"perms:123"`.
    pub key: String,
    /// Priority within the bucket.
    pub priority: Priority,
    /// Operation to run.
    pub operation: F,
}

impl<F> Submission<F> {
    /// Create a batch entry.
    pub fn new(key: impl Into<String>, priority: Priority, operation: F) -> Self {
        Self {
            key: key.into(),
            priority,
            operation,
        }
    }
}

/// State shared between the façade and every bucket processor.
pub(crate) struct SchedulerCore {
    pub config: SchedulerConfig,
    pub backoff: BackoffPolicy,
    pub buckets: RwLock<HashMap<String, Arc<Bucket>>>,
    pub cooldown: GlobalCooldown,
    pub breaker: CircuitBreaker,
    pub counters: SchedulerCounters,
    seq: AtomicU64,
}

/// Admission-control scheduler for calls to one rate-limited dependency.
///
/// Work is grouped into buckets keyed by resource. Each bucket drains in
/// priority-then-FIFO order through a single processor that applies pacing,
/// retry with backoff, lane-local and global cooldowns. Buckets run
/// concurrently with each other. A circuit breaker refuses new work after
/// sustained terminal failures.
///
/// Cloning is cheap and yields a handle to the same scheduler.
///
/// ```rust,ignore
/// use prometheus_request_queue::builders::SchedulerBuilder;
/// use prometheus_request_queue::util::Priority;
///
/// let scheduler = SchedulerBuilder::new().build()?;
/// let renamed = scheduler
///     .submit("channel:42", Priority::Normal, || api.rename(42, "general"))
///     .await?;
/// ```
pub struct Scheduler<S = TokioSpawner> {
    core: Arc<SchedulerCore>,
    spawner: S,
}

impl<S: Clone> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            spawner: self.spawner.clone(),
        }
    }
}

impl<S> fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.core.config)
            .field("buckets", &self.bucket_count())
            .field("circuit", &self.circuit_state())
            .finish_non_exhaustive()
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a scheduler from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidConfig`] if validation fails.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, BuildError> {
        config.validate().map_err(BuildError::InvalidConfig)?;

        info!(
            min_delay_ms = config.min_delay_ms,
            max_retries = config.max_retries,
            max_queue_size = config.max_queue_size,
            queue_timeout_ms = config.queue_timeout_ms,
            circuit_failure_threshold = config.circuit_failure_threshold,
            "request scheduler initialized"
        );

        let core = SchedulerCore {
            backoff: BackoffPolicy::new(config.base_backoff(), config.max_backoff(), config.max_jitter()),
            breaker: CircuitBreaker::new(
                config.circuit_failure_threshold,
                config.circuit_failure_window(),
                config.circuit_reset(),
            ),
            buckets: RwLock::new(HashMap::new()),
            cooldown: GlobalCooldown::new(),
            counters: SchedulerCounters::default(),
            seq: AtomicU64::new(0),
            config,
        };
        Ok(Self {
            core: Arc::new(core),
            spawner,
        })
    }

    /// Admit an operation into the bucket for `key`.
    ///
    /// Admission is synchronous: a full bucket or an open circuit rejects the
    /// call here and nothing is enqueued. On success the returned handle
    /// resolves with the operation's value, its terminal error, or a queue
    /// timeout. `Priority::Immediate` skips the bucket and runs the operation
    /// inline when the handle is awaited, without pacing or retry.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::CircuitOpen`] or [`SchedulerError::QueueFull`].
    pub fn enqueue<T, E, F, Fut>(
        &self,
        key: &str,
        priority: Priority,
        operation: F,
    ) -> Result<TaskHandle<T, E>, SchedulerError<E>>
    where
        T: Send + 'static,
        E: Classify + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let core = &self.core;
        SchedulerCounters::bump(&core.counters.submitted);

        if let Err(retry_in) = core.breaker.check() {
            SchedulerCounters::bump(&core.counters.rejected);
            warn!(
                bucket = key,
                ?priority,
                retry_in_ms = retry_in.as_millis(),
                "submission rejected: circuit breaker open"
            );
            return Err(SchedulerError::CircuitOpen { retry_in });
        }

        if priority.is_inline() {
            let fut = run_inline(Arc::clone(core), key.to_owned(), operation);
            return Ok(TaskHandle::inline(Box::pin(fut)));
        }

        let (tx, rx) = oneshot::channel();
        let seq = core.seq.fetch_add(1, Ordering::Relaxed);
        let task = QueuedTask::new(priority, seq, Box::new(Call::new(operation, tx)));
        let task_id = task.id;

        let (bucket, admission) = self.admit(key, task);
        match admission {
            Admission::Full { depth } => {
                SchedulerCounters::bump(&core.counters.rejected);
                warn!(bucket = key, depth, "submission rejected: queue full");
                return Err(SchedulerError::QueueFull {
                    key: key.to_owned(),
                    capacity: core.config.max_queue_size,
                });
            }
            Admission::StartProcessor => {
                self.spawner.spawn(processor::run(Arc::clone(core), bucket));
            }
            Admission::Queued => {}
        }

        debug!(bucket = key, task_id = %task_id, ?priority, "task enqueued");
        Ok(TaskHandle::queued(rx))
    }

    /// Admit an operation and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Admission rejections, [`SchedulerError::Timeout`], or the operation's
    /// terminal error as [`SchedulerError::Operation`].
    pub async fn submit<T, E, F, Fut>(
        &self,
        key: &str,
        priority: Priority,
        operation: F,
    ) -> Result<T, SchedulerError<E>>
    where
        T: Send + 'static,
        E: Classify + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.enqueue(key, priority, operation)?.await
    }

    /// Admit an operation without observing its outcome.
    ///
    /// Rejections and failures are logged at `warn` and otherwise dropped.
    /// Callers normally pass `Priority::Low`.
    pub fn fire_and_forget<T, E, F, Fut>(&self, key: &str, priority: Priority, operation: F)
    where
        T: Send + 'static,
        E: Classify + Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        match self.enqueue(key, priority, operation) {
            Ok(handle) => {
                let key = key.to_owned();
                self.spawner.spawn(async move {
                    if let Err(err) = handle.await {
                        warn!(bucket = %key, error = %err, "fire-and-forget task failed");
                    }
                });
            }
            Err(err) => {
                warn!(bucket = key, error = %err, "fire-and-forget submission rejected");
            }
        }
    }

    /// Admit every entry into its own bucket and wait for all of them.
    ///
    /// Results come back in input order. The first rejection or failure is
    /// returned; siblings already admitted keep running to completion.
    ///
    /// # Errors
    ///
    /// The first admission rejection, otherwise the first task failure.
    pub async fn submit_parallel<T, E, F, Fut, I>(&self, entries: I) -> Result<Vec<T>, SchedulerError<E>>
    where
        T: Send + 'static,
        E: Classify + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        I: IntoIterator<Item = Submission<F>>,
    {
        let mut handles = Vec::new();
        let mut rejection = None;
        for entry in entries {
            match self.enqueue(&entry.key, entry.priority, entry.operation) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    rejection.get_or_insert(err);
                }
            }
        }
        if let Some(err) = rejection {
            return Err(err);
        }
        futures::future::try_join_all(handles).await
    }

    fn admit(&self, key: &str, task: QueuedTask) -> (Arc<Bucket>, Admission) {
        let capacity = self.core.config.max_queue_size;
        {
            let buckets = self.core.buckets.read();
            if let Some(bucket) = buckets.get(key) {
                let admission = bucket.admit(task, capacity);
                return (Arc::clone(bucket), admission);
            }
        }
        let mut buckets = self.core.buckets.write();
        let bucket = Arc::clone(buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(bucket = key, "bucket created");
            Arc::new(Bucket::new(key))
        }));
        let admission = bucket.admit(task, capacity);
        (bucket, admission)
    }
}

impl<S> Scheduler<S> {
    /// Tasks in the bucket for `key`, including one being executed.
    pub fn queue_size(&self, key: &str) -> usize {
        self.core.buckets.read().get(key).map_or(0, |bucket| bucket.depth())
    }

    /// Tasks across all buckets.
    pub fn total_queue_size(&self) -> usize {
        self.core.buckets.read().values().map(|bucket| bucket.depth()).sum()
    }

    /// Whether a platform-wide cooldown is pausing every bucket.
    pub fn is_globally_cooling_down(&self) -> bool {
        self.core.cooldown.is_active()
    }

    /// Time left on the global cooldown, if active.
    pub fn global_cooldown_remaining(&self) -> Option<Duration> {
        self.core.cooldown.remaining()
    }

    /// Queue size and error streak for every known bucket.
    pub fn bucket_stats(&self) -> HashMap<String, BucketStats> {
        self.core
            .buckets
            .read()
            .iter()
            .map(|(key, bucket)| (key.clone(), bucket.stats()))
            .collect()
    }

    /// Number of buckets currently registered.
    pub fn bucket_count(&self) -> usize {
        self.core.buckets.read().len()
    }

    /// Process-wide counters.
    pub fn stats(&self) -> SchedulerStats {
        self.core.counters.snapshot()
    }

    /// Circuit breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.core.breaker.state()
    }

    /// Close the circuit breaker and clear its failure tally.
    pub fn reset_circuit(&self) {
        self.core.breaker.reset();
        info!("circuit breaker reset manually");
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SchedulerConfig {
        &self.core.config
    }

    /// Remove buckets that are idle, empty and untouched for the configured
    /// `idle_bucket_ttl`. Returns the number removed; zero when no TTL is set.
    pub fn evict_idle_buckets(&self) -> usize {
        let Some(ttl) = self.core.config.idle_bucket_ttl() else {
            return 0;
        };
        let now = Instant::now();
        let mut buckets = self.core.buckets.write();
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_evictable(now, ttl));
        let evicted = before - buckets.len();
        if evicted > 0 {
            debug!(evicted, remaining = buckets.len(), "evicted idle buckets");
        }
        evicted
    }
}

async fn run_inline<T, E, F, Fut>(
    core: Arc<SchedulerCore>,
    key: String,
    mut operation: F,
) -> Result<T, SchedulerError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug!(bucket = %key, "running immediate task inline");
    match operation().await {
        Ok(value) => {
            SchedulerCounters::bump(&core.counters.completed);
            Ok(value)
        }
        Err(err) => {
            SchedulerCounters::bump(&core.counters.failed);
            core.breaker.record_failure();
            warn!(bucket = %key, "immediate task failed");
            Err(SchedulerError::Operation(err))
        }
    }
}
