//! `labconsole status`: one poll, printed.

use std::sync::Arc;

use lc_domain::config::Config;
use lc_session::{StatusPoller, TokioScheduler};

use crate::render::{status_lines, TerminalSink};

/// Poll once and print the snapshot. Returns `false` when the backend
/// could not be reached.
pub async fn status(config: Arc<Config>, json: bool) -> anyhow::Result<bool> {
    let backend = lc_client::create_backend(&config.client)?;
    let poller = StatusPoller::new(
        backend,
        Arc::new(TerminalSink::new()),
        Arc::new(TokioScheduler),
        config.poller.clone(),
    );

    poller.poll().await;
    let snapshot = poller.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for line in status_lines(&snapshot) {
            println!("{line}");
        }
    }

    Ok(snapshot.reachable)
}
