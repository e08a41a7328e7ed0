//! Queued tasks and the handle callers await.
//!
//! Operations of any result and error type share one bucket queue, so each
//! task is erased behind [`Dispatch`]. The concrete [`Call`] keeps the typed
//! operation, the reply channel and the last error seen, which is what the
//! caller receives if the task ends in failure.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::{Classify, ErrorClass, SchedulerError};
use crate::util::Priority;

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    /// The reply was sent; the task is done.
    Succeeded,
    /// The attempt failed; the error is held until the task is settled.
    Failed(ErrorClass),
}

/// Type-erased unit of work owned by a bucket queue.
#[async_trait]
pub(crate) trait Dispatch: Send {
    /// Run the operation once.
    async fn attempt(&mut self) -> Attempt;
    /// Reject with the last attempt's error.
    fn fail(self: Box<Self>);
    /// Reject with a queue timeout.
    fn time_out(self: Box<Self>, key: String, waited: Duration);
}

type Reply<T, E> = oneshot::Sender<Result<T, SchedulerError<E>>>;

/// Typed operation plus its pending result.
pub(crate) struct Call<T, E, F> {
    operation: F,
    reply: Option<Reply<T, E>>,
    last_error: Option<E>,
}

impl<T, E, F> Call<T, E, F> {
    pub(crate) const fn new(operation: F, reply: Reply<T, E>) -> Self {
        Self {
            operation,
            reply: Some(reply),
            last_error: None,
        }
    }
}

#[async_trait]
impl<T, E, F, Fut> Dispatch for Call<T, E, F>
where
    T: Send + 'static,
    E: Classify + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    async fn attempt(&mut self) -> Attempt {
        match (self.operation)().await {
            Ok(value) => {
                if let Some(reply) = self.reply.take() {
                    // Receiver may be gone (fire-and-forget, aborted batch).
                    let _ = reply.send(Ok(value));
                }
                Attempt::Succeeded
            }
            Err(err) => {
                let class = err.classify();
                self.last_error = Some(err);
                Attempt::Failed(class)
            }
        }
    }

    fn fail(self: Box<Self>) {
        let Self {
            reply, last_error, ..
        } = *self;
        if let (Some(reply), Some(err)) = (reply, last_error) {
            let _ = reply.send(Err(SchedulerError::Operation(err)));
        }
    }

    fn time_out(self: Box<Self>, key: String, waited: Duration) {
        if let Some(reply) = self.reply {
            let _ = reply.send(Err(SchedulerError::Timeout { key, waited }));
        }
    }
}

/// A task waiting in (or being executed from) a bucket.
pub(crate) struct QueuedTask {
    pub id: Uuid,
    pub priority: Priority,
    pub seq: u64,
    pub enqueued_at: Instant,
    pub retries: u32,
    pub last_backoff: Duration,
    pub call: Box<dyn Dispatch>,
}

impl QueuedTask {
    pub(crate) fn new(priority: Priority, seq: u64, call: Box<dyn Dispatch>) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            seq,
            enqueued_at: Instant::now(),
            retries: 0,
            last_backoff: Duration::ZERO,
            call,
        }
    }

    /// Queue ordering: priority, then enqueue time, then arrival sequence.
    pub(crate) fn order_key(&self) -> (Priority, Instant, u64) {
        (self.priority, self.enqueued_at, self.seq)
    }
}

/// Future resolving to the outcome of a submitted operation.
///
/// Returned by `Scheduler::enqueue` once admission succeeded. Dropping the
/// handle does not cancel the task; it still runs and its result is
/// discarded.
#[must_use = "the task runs regardless; await the handle to observe its result"]
pub struct TaskHandle<T, E> {
    inner: HandleInner<T, E>,
}

enum HandleInner<T, E> {
    Queued(oneshot::Receiver<Result<T, SchedulerError<E>>>),
    Inline(BoxFuture<'static, Result<T, SchedulerError<E>>>),
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) const fn queued(rx: oneshot::Receiver<Result<T, SchedulerError<E>>>) -> Self {
        Self {
            inner: HandleInner::Queued(rx),
        }
    }

    pub(crate) const fn inline(fut: BoxFuture<'static, Result<T, SchedulerError<E>>>) -> Self {
        Self {
            inner: HandleInner::Inline(fut),
        }
    }

    /// Whether the operation bypassed the queue and runs on await.
    pub const fn is_inline(&self) -> bool {
        matches!(self.inner, HandleInner::Inline(_))
    }
}

impl<T, E> Unpin for TaskHandle<T, E> {}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, SchedulerError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            HandleInner::Queued(rx) => Pin::new(rx)
                .poll(cx)
                .map(|res| res.unwrap_or_else(|_| Err(SchedulerError::Abandoned))),
            HandleInner::Inline(fut) => fut.as_mut().poll(cx),
        }
    }
}
