//! Sequential drain loop for a single bucket.
//!
//! One processor runs per non-empty bucket. Each iteration sweeps stale
//! tasks, honours the global cooldown, the lane retry-after and the pacing
//! delay, then executes the head task and acts on its classification. The
//! cooldown is checked again right before dispatch, since it may be tripped
//! by another bucket while this one sleeps.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::backoff::jitter;
use crate::core::bucket::Bucket;
use crate::core::scheduler::SchedulerCore;
use crate::core::stats::SchedulerCounters;
use crate::core::task::Attempt;
use crate::core::{ErrorClass, RateLimitScope};

/// Drain `bucket` until it is empty, then clear its processing flag.
///
/// A panicking operation is contained here and counted as a terminal
/// failure, so the bucket keeps draining.
pub(crate) async fn run(core: Arc<SchedulerCore>, bucket: Arc<Bucket>) {
    let config = &core.config;
    let key = bucket.key();
    debug!(bucket = key, "bucket processor started");

    loop {
        // Queue is kept sorted on insert; only the timeout sweep is needed here.
        let (expired, idle) = {
            let mut state = bucket.lock();
            let expired = state.sweep_expired(Instant::now(), config.queue_timeout());
            let idle = state.finish_if_idle();
            (expired, idle)
        };
        for task in expired {
            let waited = task.enqueued_at.elapsed();
            SchedulerCounters::bump(&core.counters.timed_out);
            warn!(
                bucket = key,
                task_id = %task.id,
                waited_ms = waited.as_millis(),
                "task timed out in queue"
            );
            task.call.time_out(key.to_owned(), waited);
        }
        if idle {
            debug!(bucket = key, "bucket drained, processor exiting");
            return;
        }

        if let Some(remaining) = core.cooldown.remaining() {
            let pause = remaining + jitter(config.max_jitter());
            debug!(bucket = key, pause_ms = pause.as_millis(), "waiting out global cooldown");
            sleep(pause).await;
            if core.cooldown.clear_if_elapsed() {
                info!(bucket = key, "global cooldown cleared");
            }
        }

        let lane_deadline = bucket.lock().retry_after;
        if let Some(deadline) = lane_deadline {
            if deadline > Instant::now() {
                debug!(
                    bucket = key,
                    pause_ms = (deadline - Instant::now()).as_millis(),
                    "waiting out lane retry-after"
                );
                sleep_until(deadline).await;
            }
            bucket.lock().retry_after = None;
        }

        let pacing = {
            let state = bucket.lock();
            state.last_dispatch.map(|last| {
                let mut min_delay = config.min_delay();
                if state.consecutive_errors >= config.error_threshold {
                    min_delay *= config.slowdown_multiplier;
                }
                (last + min_delay + jitter(config.max_jitter())).saturating_duration_since(Instant::now())
            })
        };
        if let Some(wait) = pacing {
            if !wait.is_zero() {
                sleep(wait).await;
            }
        }

        // Another bucket may have tripped the cooldown during the sleeps above.
        if core.cooldown.is_active() {
            continue;
        }

        let head = {
            let mut state = bucket.lock();
            let head = state.take_head();
            if head.is_some() {
                state.last_dispatch = Some(Instant::now());
            }
            head
        };
        let Some(mut task) = head else {
            continue;
        };

        debug!(
            bucket = key,
            task_id = %task.id,
            priority = ?task.priority,
            retries = task.retries,
            "dispatching task"
        );

        let Ok(attempt) = AssertUnwindSafe(task.call.attempt()).catch_unwind().await else {
            {
                let mut state = bucket.lock();
                state.settle();
                state.consecutive_errors = state.consecutive_errors.saturating_add(1);
            }
            SchedulerCounters::bump(&core.counters.failed);
            core.breaker.record_failure();
            warn!(bucket = key, task_id = %task.id, "operation panicked, task abandoned");
            // Dropping the task drops its reply; the caller sees `Abandoned`.
            continue;
        };

        match attempt {
            Attempt::Succeeded => {
                let mut state = bucket.lock();
                state.settle();
                state.consecutive_errors = 0;
                drop(state);
                SchedulerCounters::bump(&core.counters.completed);
                debug!(bucket = key, task_id = %task.id, retries = task.retries, "task completed");
            }
            Attempt::Failed(ErrorClass::RateLimited { scope, retry_after }) => {
                SchedulerCounters::bump(&core.counters.rate_limited);
                let wait = retry_after.unwrap_or_else(|| config.global_cooldown());
                let mut state = bucket.lock();
                match scope {
                    RateLimitScope::Global => {
                        core.cooldown.trip(wait);
                        warn!(bucket = key, cooldown_ms = wait.as_millis(), "global rate limit hit, pausing all buckets");
                    }
                    RateLimitScope::Lane => {
                        state.retry_after = Some(Instant::now() + wait + jitter(config.max_jitter()));
                        warn!(bucket = key, retry_after_ms = wait.as_millis(), "lane rate limit hit");
                    }
                }
                state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                state.requeue(task);
            }
            Attempt::Failed(ErrorClass::Transient) if task.retries < config.max_retries => {
                task.retries += 1;
                let delay = core.backoff.delay(task.retries, task.last_backoff);
                task.last_backoff = delay;
                {
                    let mut state = bucket.lock();
                    state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                }
                SchedulerCounters::bump(&core.counters.retried);
                warn!(
                    bucket = key,
                    task_id = %task.id,
                    retry = task.retries,
                    max_retries = config.max_retries,
                    backoff_ms = delay.as_millis(),
                    "transient failure, retrying"
                );
                sleep(delay).await;
                bucket.lock().requeue(task);
            }
            Attempt::Failed(class) => {
                {
                    let mut state = bucket.lock();
                    state.settle();
                    state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                }
                SchedulerCounters::bump(&core.counters.failed);
                core.breaker.record_failure();
                warn!(
                    bucket = key,
                    task_id = %task.id,
                    ?class,
                    retries = task.retries,
                    "task failed"
                );
                task.call.fail();
            }
        }
    }
}
