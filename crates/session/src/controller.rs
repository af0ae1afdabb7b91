//! Turn controller: one send → reply → persist cycle at a time.
//!
//! ```text
//!   Idle ──submit──▶ Sending ──response──▶ Finishing ──▶ Idle
//!                       │
//!                       └──submit/abort──▶ Cancelled ──submit──▶ Sending
//! ```
//!
//! Every turn runs in its own tokio task under a fresh
//! `CancellationToken`. A response is only committed if the token was
//! not cancelled when the phase switches to `Finishing`; from then on the
//! turn always completes and further submits are ignored.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use lc_client::{ChatRequest, ChatResponse, ConsoleBackend, VerifyRequest};
use lc_domain::error::Error;
use lc_domain::trace::TraceEvent;
use lc_domain::{Confidence, Message, Turn};

use crate::sink::{ConsoleSink, ErrorKind};
use crate::store::TurnStore;

/// Informational notice for a turn the user stopped.
pub const STOPPED_BY_USER: &str = "Stopped by user.";

#[derive(Debug)]
enum Phase {
    Idle,
    Sending {
        turn_id: String,
        cancel: CancellationToken,
    },
    Finishing {
        turn_id: String,
    },
    Cancelled {
        turn_id: String,
    },
}

impl Phase {
    fn turn_id(&self) -> Option<&str> {
        match self {
            Phase::Idle => None,
            Phase::Sending { turn_id, .. }
            | Phase::Finishing { turn_id }
            | Phase::Cancelled { turn_id } => Some(turn_id),
        }
    }
}

/// Result of [`TurnController::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Blank input, or a response is already being finished.
    Ignored,
    /// A turn was in flight; it has been cancelled instead of sending.
    Cancelled,
    Started(TurnHandle),
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { index: usize },
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

/// Owns the cancellation token of one in-flight turn.
#[derive(Debug)]
pub struct TurnHandle {
    turn_id: String,
    cancel: CancellationToken,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    /// Signal cancellation. Has no effect once the response was accepted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the turn task to finish.
    pub async fn wait(self) -> TurnOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => TurnOutcome::Failed {
                kind: ErrorKind::Network,
                message: format!("turn task failed: {e}"),
            },
        }
    }
}

/// Result of [`TurnController::verify`].
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Upgraded(Confidence),
    /// Already verified, no tool calls, or no such turn. No request sent.
    NotEligible,
    /// A verification of this turn is already running. No request sent.
    InFlight,
    /// The log was cleared while the verification ran.
    Discarded,
    /// The request failed or returned no verdict; the heuristic stays.
    Failed,
}

struct ControllerInner {
    backend: Arc<dyn ConsoleBackend>,
    store: TurnStore,
    sink: Arc<dyn ConsoleSink>,
    phase: Mutex<Phase>,
    /// (generation, index) of turns with a verification in flight.
    verifying: Mutex<HashSet<(u64, usize)>>,
}

/// Drives conversational turns against the backend. Cheap to clone.
#[derive(Clone)]
pub struct TurnController {
    inner: Arc<ControllerInner>,
}

impl TurnController {
    pub fn new(
        backend: Arc<dyn ConsoleBackend>,
        store: TurnStore,
        sink: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                backend,
                store,
                sink,
                phase: Mutex::new(Phase::Idle),
                verifying: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn store(&self) -> &TurnStore {
        &self.inner.store
    }

    /// Whether a request is in flight (not yet answered or cancelled).
    pub fn is_sending(&self) -> bool {
        matches!(*self.inner.phase.lock(), Phase::Sending { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(*self.inner.phase.lock(), Phase::Idle)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Send / abort
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Submit user input.
    ///
    /// While a turn is in flight this acts as the stop control: the turn
    /// is cancelled and `text` is not sent, even when it is blank. Must be
    /// called inside a tokio runtime.
    pub fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();

        let (turn_id, cancel) = {
            let mut phase = self.inner.phase.lock();
            match *phase {
                Phase::Sending { .. } => {
                    cancel_in_flight(&mut phase);
                    return SubmitOutcome::Cancelled;
                }
                Phase::Finishing { .. } => return SubmitOutcome::Ignored,
                Phase::Idle | Phase::Cancelled { .. } => {}
            }
            if text.is_empty() {
                return SubmitOutcome::Ignored;
            }
            let turn_id = Uuid::new_v4().to_string();
            let cancel = CancellationToken::new();
            *phase = Phase::Sending {
                turn_id: turn_id.clone(),
                cancel: cancel.clone(),
            };
            (turn_id, cancel)
        };

        let history = self.inner.store.history();
        self.inner.store.push_message(Message::user(text));
        self.inner.sink.on_user_message(text);

        TraceEvent::TurnStarted {
            turn_id: turn_id.clone(),
            history_len: history.len(),
        }
        .emit();

        let request = ChatRequest {
            message: text.to_owned(),
            history,
        };
        let join = tokio::spawn(run_turn(
            self.inner.clone(),
            turn_id.clone(),
            request,
            cancel.clone(),
        ));

        SubmitOutcome::Started(TurnHandle {
            turn_id,
            cancel,
            join,
        })
    }

    /// Cancel the in-flight turn. Returns `false` when nothing was sending.
    pub fn abort(&self) -> bool {
        let mut phase = self.inner.phase.lock();
        if matches!(*phase, Phase::Sending { .. }) {
            cancel_in_flight(&mut phase);
            true
        } else {
            false
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Verification
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Ask for a model-based verification of turn `index` and upgrade its
    /// confidence on success.
    pub async fn verify(&self, index: usize) -> VerifyOutcome {
        let inner = &self.inner;
        let generation = inner.store.generation();
        let turn = match inner.store.turn(index) {
            Some(turn) if turn.can_verify() => turn,
            _ => return VerifyOutcome::NotEligible,
        };
        let Some(heuristic) = turn.confidence.clone() else {
            return VerifyOutcome::NotEligible;
        };
        if !inner.verifying.lock().insert((generation, index)) {
            return VerifyOutcome::InFlight;
        }

        let result = inner
            .backend
            .verify(VerifyRequest {
                reply: turn.reply.clone(),
                tool_calls: turn.tool_calls.clone(),
            })
            .await;
        inner.verifying.lock().remove(&(generation, index));

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                let (kind, message) = classify(&e);
                tracing::warn!(index, error = %e, "verification failed");
                inner.sink.on_error(kind, &message);
                return VerifyOutcome::Failed;
            }
        };
        let Some(verdict) = resp.verdict() else {
            tracing::warn!(index, "verification returned no verdict");
            inner
                .sink
                .on_error(ErrorKind::Server, "Verification returned no verdict.");
            return VerifyOutcome::Failed;
        };
        let Some(upgraded) = heuristic.upgrade(verdict) else {
            return VerifyOutcome::NotEligible;
        };

        let Some(total) = inner.store.upgrade_confidence(
            generation,
            index,
            upgraded.clone(),
            resp.token_usage,
        ) else {
            return VerifyOutcome::Discarded;
        };

        inner.sink.on_confidence(index, &upgraded);
        if let Some(usage) = resp.token_usage {
            inner.sink.on_token_usage(&usage, total);
        }

        let assessment = upgraded.assessment();
        TraceEvent::ConfidenceUpgraded {
            turn_index: index,
            score: assessment.score,
            label: assessment.label.clone(),
            total_tokens: resp.token_usage.map(|u| u.total_tokens).unwrap_or(0),
        }
        .emit();

        VerifyOutcome::Upgraded(upgraded)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Restore / reset
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Load the saved session and replay it to the sink through the same
    /// path live turns take. Returns the number of turns replayed.
    pub async fn restore(&self) -> usize {
        if self.inner.store.load().await == 0 {
            return 0;
        }

        let turns = self.inner.store.turns();
        let mut running = 0u64;
        for (index, turn) in turns.iter().enumerate() {
            running += turn.tokens_spent();
            self.inner.sink.on_user_message(&turn.user_text);
            render_turn(self.inner.sink.as_ref(), index, turn, running);
        }
        turns.len()
    }

    /// Abort any in-flight turn and clear the log, local and remote.
    pub fn reset(&self) {
        self.abort();
        self.inner.verifying.lock().clear();
        self.inner.store.clear();
    }
}

// ── helpers ──────────────────────────────────────────────────────────

fn cancel_in_flight(phase: &mut Phase) {
    if let Phase::Sending { turn_id, cancel } = phase {
        cancel.cancel();
        let turn_id = std::mem::take(turn_id);
        *phase = Phase::Cancelled { turn_id };
    }
}

/// Return to `Idle` unless another turn already owns the phase.
fn release_phase(inner: &ControllerInner, turn_id: &str) {
    let mut phase = inner.phase.lock();
    if phase.turn_id() == Some(turn_id) {
        *phase = Phase::Idle;
    }
}

/// Map a failure onto what the user is told.
fn classify(e: &Error) -> (ErrorKind, String) {
    match e {
        Error::Server { detail, .. } => (ErrorKind::Server, detail.clone()),
        Error::Cancelled => (ErrorKind::Cancelled, STOPPED_BY_USER.to_owned()),
        Error::Transport(msg) => (ErrorKind::Network, msg.clone()),
        other => (ErrorKind::Network, other.to_string()),
    }
}

/// Emit one turn's reply side: tool calls, assistant message,
/// confidence, token usage.
fn render_turn(sink: &dyn ConsoleSink, index: usize, turn: &Turn, session_total: u64) {
    if !turn.tool_calls.is_empty() {
        sink.on_tool_calls(&turn.tool_calls);
    }
    sink.on_assistant_message(&turn.reply);
    if let Some(ref confidence) = turn.confidence {
        sink.on_confidence(index, confidence);
    }
    if let Some(ref usage) = turn.token_usage {
        sink.on_token_usage(usage, session_total);
    }
}

async fn run_turn(
    inner: Arc<ControllerInner>,
    turn_id: String,
    request: ChatRequest,
    cancel: CancellationToken,
) -> TurnOutcome {
    let user_text = request.message.clone();
    // The request branch is polled first so it is always issued, even
    // when the turn was cancelled before this task first ran.
    let result = tokio::select! {
        biased;
        r = inner.backend.chat(request) => r,
        _ = cancel.cancelled() => Err(Error::Cancelled),
    };

    // Commit point: a response is accepted only if the token is still
    // live when the phase moves to Finishing.
    let accepted: Result<ChatResponse, Error> = {
        let mut phase = inner.phase.lock();
        if cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            match result {
                Ok(resp) => {
                    *phase = Phase::Finishing {
                        turn_id: turn_id.clone(),
                    };
                    Ok(resp)
                }
                Err(e) => Err(e),
            }
        }
    };

    let outcome = match accepted {
        Ok(resp) => {
            let index = finish_turn(&inner, &turn_id, user_text, resp);
            TurnOutcome::Completed { index }
        }
        Err(e) => {
            let (kind, message) = classify(&e);
            inner.sink.on_error(kind, &message);
            if kind == ErrorKind::Cancelled {
                TraceEvent::TurnCancelled {
                    turn_id: turn_id.clone(),
                }
                .emit();
                TurnOutcome::Cancelled
            } else {
                tracing::warn!(turn_id = %turn_id, error = %e, "turn failed");
                TraceEvent::TurnFailed {
                    turn_id: turn_id.clone(),
                    kind: kind.as_str().to_owned(),
                    message: message.clone(),
                }
                .emit();
                TurnOutcome::Failed { kind, message }
            }
        }
    };

    release_phase(&inner, &turn_id);
    outcome
}

fn finish_turn(
    inner: &ControllerInner,
    turn_id: &str,
    user_text: String,
    resp: ChatResponse,
) -> usize {
    let confidence = resp.confidence();
    inner.store.push_message(Message::assistant(&resp.reply));

    let turn = Turn {
        user_text,
        reply: resp.reply,
        tool_calls: resp.tool_calls,
        confidence,
        token_usage: resp.token_usage,
        verification_usage: None,
    };
    // Rendered first, then persisted: the sink sees the log as it was
    // before this turn.
    let session_tokens = inner.store.session_tokens() + turn.tokens_spent();
    render_turn(inner.sink.as_ref(), inner.store.len(), &turn, session_tokens);
    let tool_calls = turn.tool_calls.len();
    let total_tokens = turn.tokens_spent();
    let index = inner.store.append(turn);

    TraceEvent::TurnCompleted {
        turn_id: turn_id.to_owned(),
        tool_calls,
        total_tokens,
        session_tokens,
    }
    .emit();
    index
}
