use serde::Serialize;

/// Structured trace events emitted across all console crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    TurnStarted {
        turn_id: String,
        history_len: usize,
    },
    TurnCompleted {
        turn_id: String,
        tool_calls: usize,
        total_tokens: u64,
        session_tokens: u64,
    },
    TurnCancelled {
        turn_id: String,
    },
    TurnFailed {
        turn_id: String,
        kind: String,
        message: String,
    },
    ConfidenceUpgraded {
        turn_index: usize,
        score: f64,
        label: String,
        total_tokens: u64,
    },
    SessionLoaded {
        turns: usize,
        session_tokens: u64,
    },
    SessionSaved {
        turns: usize,
        session_tokens: u64,
    },
    SessionCleared {
        generation: u64,
    },
    StatusPolled {
        reachable: bool,
        online: usize,
        services: usize,
        total_tools: usize,
        next_delay_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lc_event");
    }
}
