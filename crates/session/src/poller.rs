//! Adaptive status poller.
//!
//! Each poll re-arms a single-shot timer whose delay depends on the
//! result: long while every service is online, short while something is
//! offline, and a middle value while the status endpoint itself is
//! unreachable. At most one timer is outstanding; a newer poll cancels
//! the pending timer and supersedes any poll still awaiting its response.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use lc_client::ConsoleBackend;
use lc_domain::config::PollerConfig;
use lc_domain::error::Error;
use lc_domain::trace::TraceEvent;
use lc_domain::StatusSnapshot;

use crate::scheduler::{Scheduler, TimerHandle};
use crate::sink::ConsoleSink;

/// What a completed poll observed, reduced to what the delay policy needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    Success {
        online_count: usize,
        service_count: usize,
    },
    Failure,
}

/// Delay before the next poll.
pub fn next_delay(result: &PollResult, policy: &PollerConfig) -> Duration {
    let ms = match *result {
        PollResult::Success {
            online_count,
            service_count,
        } if online_count == service_count => policy.healthy_interval_ms,
        PollResult::Success { .. } => policy.degraded_interval_ms,
        PollResult::Failure => policy.failure_interval_ms,
    };
    Duration::from_millis(ms)
}

struct PollerState {
    snapshot: StatusSnapshot,
    /// `online_count` of the last *successful* poll.
    last_online: Option<usize>,
    pending: Option<Box<dyn TimerHandle>>,
    /// Identifies the most recent poll; older completions are discarded.
    epoch: u64,
    running: bool,
}

struct PollerInner {
    backend: Arc<dyn ConsoleBackend>,
    sink: Arc<dyn ConsoleSink>,
    scheduler: Arc<dyn Scheduler>,
    policy: PollerConfig,
    state: Mutex<PollerState>,
}

/// Periodic status poller. Cheap to clone; clones share state.
///
/// A poller that was never started (or was stopped) still answers
/// explicit [`StatusPoller::poll`] calls but does not re-arm.
#[derive(Clone)]
pub struct StatusPoller {
    inner: Arc<PollerInner>,
}

impl StatusPoller {
    pub fn new(
        backend: Arc<dyn ConsoleBackend>,
        sink: Arc<dyn ConsoleSink>,
        scheduler: Arc<dyn Scheduler>,
        policy: PollerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                backend,
                sink,
                scheduler,
                policy,
                state: Mutex::new(PollerState {
                    snapshot: StatusSnapshot::default(),
                    last_online: None,
                    pending: None,
                    epoch: 0,
                    running: false,
                }),
            }),
        }
    }

    /// The view produced by the last completed poll.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Begin periodic polling with an immediate poll.
    pub fn start(&self) -> BoxFuture<'static, Option<PollResult>> {
        self.inner.state.lock().running = true;
        self.poll()
    }

    /// Cancel the pending timer and discard any poll still in flight.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        state.running = false;
        state.epoch += 1;
        if let Some(timer) = state.pending.take() {
            timer.cancel();
        }
    }

    /// Poll now. Resolves to `None` when the result was superseded by a
    /// newer poll or a stop.
    pub fn poll(&self) -> BoxFuture<'static, Option<PollResult>> {
        let this = self.clone();
        Box::pin(async move { this.run_poll().await })
    }

    async fn run_poll(self) -> Option<PollResult> {
        let epoch = {
            let mut state = self.inner.state.lock();
            if let Some(timer) = state.pending.take() {
                timer.cancel();
            }
            state.epoch += 1;
            state.epoch
        };

        let fetched = match self.inner.backend.status().await {
            Ok(report) => match report.error.clone() {
                Some(err) => Err(Error::Other(err)),
                None => Ok(report.into_snapshot()),
            },
            Err(e) => Err(e),
        };

        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            tracing::debug!(epoch, "status poll superseded, discarding result");
            return None;
        }

        let mut changed = None;
        let (snapshot, result) = match fetched {
            Ok(snapshot) => {
                if let Some(previous) = state.last_online {
                    if previous != snapshot.online_count {
                        changed = Some((previous, snapshot.online_count));
                    }
                }
                state.last_online = Some(snapshot.online_count);
                let result = PollResult::Success {
                    online_count: snapshot.online_count,
                    service_count: snapshot.services.len(),
                };
                (snapshot, result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "status poll failed");
                (StatusSnapshot::unreachable(&state.snapshot), PollResult::Failure)
            }
        };
        state.snapshot = snapshot.clone();

        let delay = next_delay(&result, &self.inner.policy);
        if state.running {
            let next = self.clone();
            let job: BoxFuture<'static, ()> = Box::pin(async move {
                let _ = next.poll().await;
            });
            state.pending = Some(self.inner.scheduler.schedule(delay, job));
        }
        let running = state.running;
        drop(state);

        self.inner.sink.on_status_change(&snapshot);
        if let Some((previous, current)) = changed {
            self.inner.sink.on_services_changed(previous, current);
        }

        TraceEvent::StatusPolled {
            reachable: snapshot.reachable,
            online: snapshot.online_count,
            services: snapshot.services.len(),
            total_tools: snapshot.total_tools,
            next_delay_ms: if running { delay.as_millis() as u64 } else { 0 },
        }
        .emit();

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(online_count: usize, service_count: usize) -> PollResult {
        PollResult::Success {
            online_count,
            service_count,
        }
    }

    #[test]
    fn all_online_uses_healthy_interval() {
        let policy = PollerConfig::default();
        assert_eq!(next_delay(&success(4, 4), &policy), Duration::from_millis(30_000));
    }

    #[test]
    fn any_offline_uses_degraded_interval() {
        let policy = PollerConfig::default();
        assert_eq!(next_delay(&success(3, 4), &policy), Duration::from_millis(3_000));
        assert_eq!(next_delay(&success(0, 4), &policy), Duration::from_millis(3_000));
    }

    #[test]
    fn failure_uses_failure_interval() {
        let policy = PollerConfig::default();
        assert_eq!(next_delay(&PollResult::Failure, &policy), Duration::from_millis(5_000));
    }

    #[test]
    fn no_services_counts_as_healthy() {
        let policy = PollerConfig::default();
        assert_eq!(next_delay(&success(0, 0), &policy), Duration::from_millis(30_000));
    }

    #[test]
    fn delay_follows_configured_intervals() {
        let policy = PollerConfig {
            healthy_interval_ms: 60_000,
            degraded_interval_ms: 1_000,
            failure_interval_ms: 2_500,
            ..Default::default()
        };
        for online in 0..=5 {
            let expected = if online == 5 { 60_000 } else { 1_000 };
            assert_eq!(
                next_delay(&success(online, 5), &policy),
                Duration::from_millis(expected)
            );
        }
        assert_eq!(next_delay(&PollResult::Failure, &policy), Duration::from_millis(2_500));
    }
}
