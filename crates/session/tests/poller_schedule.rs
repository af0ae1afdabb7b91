//! Status poller rescheduling, edge-triggered refresh and supersede
//! rules, driven by the manual scheduler.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{drain, report, service, ScriptedBackend, Script};
use lc_client::StatusReport;
use lc_domain::config::PollerConfig;
use lc_domain::ServiceState;
use lc_session::{
    ChannelSink, ConsoleEvent, ManualScheduler, PollResult, StatusPoller, TokioScheduler,
};
use tokio::sync::{mpsc, Notify};

const HEALTHY: Duration = Duration::from_millis(30_000);
const DEGRADED: Duration = Duration::from_millis(3_000);
const FAILED: Duration = Duration::from_millis(5_000);

fn setup() -> (
    Arc<ScriptedBackend>,
    ManualScheduler,
    StatusPoller,
    mpsc::UnboundedReceiver<ConsoleEvent>,
) {
    let backend = ScriptedBackend::new();
    let scheduler = ManualScheduler::new();
    let (sink, rx) = ChannelSink::new();
    let poller = StatusPoller::new(
        backend.clone(),
        Arc::new(sink),
        Arc::new(scheduler.clone()),
        PollerConfig::default(),
    );
    (backend, scheduler, poller, rx)
}

fn services_changed(events: &[ConsoleEvent]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            ConsoleEvent::ServicesChanged { previous, current } => Some((*previous, *current)),
            _ => None,
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interval selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn all_online_rearms_with_healthy_interval() {
    let (backend, scheduler, poller, mut rx) = setup();
    backend.push_status(Script::Reply(report(vec![
        service("user", true, 4),
        service("gitea", true, 3),
    ])));

    let result = poller.start().await;
    assert_eq!(
        result,
        Some(PollResult::Success {
            online_count: 2,
            service_count: 2
        })
    );
    assert_eq!(scheduler.pending(), vec![HEALTHY]);

    let snapshot = poller.snapshot();
    assert_eq!(snapshot.online_count, 2);
    assert_eq!(snapshot.total_tools, 7);
    assert!(snapshot.reachable);

    let events = drain(&mut rx);
    assert!(matches!(events[0], ConsoleEvent::StatusChange { .. }));
    assert!(services_changed(&events).is_empty());
}

#[tokio::test]
async fn interval_tracks_health_across_polls() {
    let (backend, scheduler, poller, mut rx) = setup();
    backend.push_status(Script::Reply(report(vec![
        service("user", true, 4),
        service("gitea", true, 3),
    ])));
    backend.push_status(Script::Reply(report(vec![
        service("user", true, 4),
        service("gitea", false, 0),
    ])));
    backend.push_status(Script::Fail(lc_domain::error::Error::Transport(
        "connection refused".into(),
    )));
    backend.push_status(Script::Reply(report(vec![
        service("user", true, 4),
        service("gitea", false, 0),
    ])));
    backend.push_status(Script::Reply(report(vec![
        service("user", true, 4),
        service("gitea", true, 3),
    ])));

    poller.start().await;
    for _ in 0..4 {
        assert!(scheduler.run_next().await);
    }

    assert_eq!(scheduler.delays(), vec![HEALTHY, DEGRADED, FAILED, DEGRADED, HEALTHY]);
    assert_eq!(scheduler.pending(), vec![HEALTHY]);
    assert_eq!(backend.status_count(), 5);

    // 2→1 signals; the failure neither signals nor resets the baseline,
    // so the following 1/2 is quiet and 1→2 signals.
    assert_eq!(services_changed(&drain(&mut rx)), vec![(2, 1), (1, 2)]);
}

#[tokio::test]
async fn failed_poll_marks_known_services_offline() {
    let (backend, scheduler, poller, mut rx) = setup();
    backend.push_status(Script::Reply(report(vec![service("user", true, 4)])));
    poller.start().await;
    drain(&mut rx);

    // Nothing scripted: the backend is unreachable.
    assert!(scheduler.run_next().await);
    let snapshot = poller.snapshot();
    assert!(!snapshot.reachable);
    assert_eq!(snapshot.online_count, 0);
    assert_eq!(snapshot.total_tools, 0);
    assert_eq!(snapshot.services[0].status, ServiceState::Offline);
    assert_eq!(scheduler.pending(), vec![FAILED]);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ConsoleEvent::StatusChange { .. }));
}

#[tokio::test]
async fn status_error_field_counts_as_failure() {
    let (backend, scheduler, poller, _rx) = setup();
    backend.push_status(Script::Reply(StatusReport {
        engine: Some("podman".into()),
        error: Some("tool servers unreachable".into()),
        ..Default::default()
    }));

    assert_eq!(poller.start().await, Some(PollResult::Failure));
    assert_eq!(scheduler.pending(), vec![FAILED]);
    assert!(!poller.snapshot().reachable);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Timer ownership
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn manual_poll_replaces_pending_timer() {
    let (backend, scheduler, poller, _rx) = setup();
    backend.push_status(Script::Reply(report(vec![service("user", true, 1)])));
    backend.push_status(Script::Reply(report(vec![service("user", false, 0)])));

    poller.start().await;
    poller.poll().await;

    assert_eq!(scheduler.delays(), vec![HEALTHY, DEGRADED]);
    assert_eq!(scheduler.pending(), vec![DEGRADED]);
}

#[tokio::test]
async fn superseded_poll_is_discarded() {
    let (backend, scheduler, poller, mut rx) = setup();
    let gate = Arc::new(Notify::new());
    backend.push_status(Script::Gated(
        gate.clone(),
        report(vec![service("user", false, 0)]),
    ));
    backend.push_status(Script::Reply(report(vec![service("user", true, 2)])));

    let older = tokio::spawn(poller.start());
    while backend.status_count() == 0 {
        tokio::task::yield_now().await;
    }

    let newer = poller.poll().await;
    assert!(matches!(newer, Some(PollResult::Success { online_count: 1, .. })));

    gate.notify_one();
    assert_eq!(older.await.unwrap(), None);

    assert_eq!(poller.snapshot().online_count, 1);
    assert_eq!(scheduler.pending(), vec![HEALTHY]);
    let status_changes = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, ConsoleEvent::StatusChange { .. }))
        .count();
    assert_eq!(status_changes, 1);
}

#[tokio::test]
async fn stop_cancels_timer_and_ignores_in_flight_result() {
    let (backend, scheduler, poller, mut rx) = setup();
    backend.push_status(Script::Reply(report(vec![service("user", true, 1)])));
    poller.start().await;
    drain(&mut rx);

    poller.stop();
    assert!(scheduler.pending().is_empty());
    assert!(!scheduler.run_next().await);
    assert!(!poller.is_running());

    let gate = Arc::new(Notify::new());
    backend.push_status(Script::Gated(gate.clone(), report(vec![])));
    let in_flight = tokio::spawn(poller.poll());
    while backend.status_count() == 1 {
        tokio::task::yield_now().await;
    }
    poller.stop();
    gate.notify_one();

    assert_eq!(in_flight.await.unwrap(), None);
    assert!(drain(&mut rx).is_empty());
    assert!(scheduler.pending().is_empty());
}

#[tokio::test]
async fn unstarted_poller_does_not_rearm() {
    let (backend, scheduler, poller, _rx) = setup();
    backend.push_status(Script::Reply(report(vec![service("user", true, 1)])));

    assert!(poller.poll().await.is_some());
    assert!(scheduler.delays().is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tokio clock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_fires_after_healthy_interval() {
    let backend = ScriptedBackend::new();
    backend.push_status(Script::Reply(report(vec![service("user", true, 1)])));
    backend.push_status(Script::Reply(report(vec![service("user", true, 1)])));
    let (sink, _rx) = ChannelSink::new();
    let poller = StatusPoller::new(
        backend.clone(),
        Arc::new(sink),
        Arc::new(TokioScheduler),
        PollerConfig::default(),
    );

    poller.start().await;
    assert_eq!(backend.status_count(), 1);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(backend.status_count(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert_eq!(backend.status_count(), 2);

    poller.stop();
}
