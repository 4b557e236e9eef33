/*!
 * Deferred-task scheduling.
 *
 * The handler owns no threads; delayed follow-up refreshes are handed
 * to a process-wide scheduler as fire-and-forget tasks. Tasks always
 * run to completion once their delay elapses; there is no cancellation
 * handle.
 */
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time;

/// A shared, time-ordered deferred-task facility
///
/// Each task fires no earlier than its requested delay; relative firing
/// order across different delays is not guaranteed.
pub trait Scheduler: Send + Sync {
    /// Run `task` after `delay` has elapsed
    fn schedule_after(&self, delay: Duration, task: BoxFuture<'static, ()>);
}

/// Tokio-backed scheduler spawning one sleep-then-run task per submission
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        tokio::spawn(async move {
            time::sleep(delay).await;
            task.await;
        });
    }
}
