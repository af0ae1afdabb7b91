//! Single-shot timers behind a trait, so the poller can be driven by the
//! tokio clock in production and stepped by hand in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

/// Cancels one scheduled job. Cancelling a job that already fired is a
/// no-op.
pub trait TimerHandle: Send + Sync {
    fn cancel(&self);
}

/// Runs a job once after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, job: BoxFuture<'static, ()>) -> Box<dyn TimerHandle>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tokio
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Timers on the tokio clock. Must be used inside a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

struct TokioTimer(AbortHandle);

impl TimerHandle for TokioTimer {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, job: BoxFuture<'static, ()>) -> Box<dyn TimerHandle> {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached: a job may cancel its own timer while it runs.
            tokio::spawn(job);
        });
        Box::new(TokioTimer(handle.abort_handle()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Manual
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ManualJob {
    delay: Duration,
    cancelled: Arc<AtomicBool>,
    job: Option<BoxFuture<'static, ()>>,
}

/// A scheduler that never fires on its own. Tests inspect what was
/// scheduled and run jobs explicitly with [`ManualScheduler::run_next`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    jobs: Arc<Mutex<Vec<ManualJob>>>,
}

struct ManualTimer(Arc<AtomicBool>);

impl TimerHandle for ManualTimer {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay ever scheduled, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.jobs.lock().iter().map(|j| j.delay).collect()
    }

    /// Delays of jobs that are neither cancelled nor run yet.
    pub fn pending(&self) -> Vec<Duration> {
        self.jobs
            .lock()
            .iter()
            .filter(|j| j.job.is_some() && !j.cancelled.load(Ordering::Acquire))
            .map(|j| j.delay)
            .collect()
    }

    /// Run the oldest pending job to completion. Returns `false` when
    /// nothing is pending.
    pub async fn run_next(&self) -> bool {
        let job = {
            let mut jobs = self.jobs.lock();
            jobs.iter_mut()
                .find(|j| j.job.is_some() && !j.cancelled.load(Ordering::Acquire))
                .and_then(|j| j.job.take())
        };
        match job {
            Some(job) => {
                job.await;
                true
            }
            None => false,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: BoxFuture<'static, ()>) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.jobs.lock().push(ManualJob {
            delay,
            cancelled: cancelled.clone(),
            job: Some(job),
        });
        Box::new(ManualTimer(cancelled))
    }
}
