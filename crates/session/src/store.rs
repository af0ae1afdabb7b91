//! Client-side turn log, mirrored to the backend's session history.
//!
//! The in-memory log is authoritative for the running console. Every
//! mutation queues a full snapshot (or a delete) to a single background
//! persister task, so remote writes land in the order they were issued
//! and never block the caller. Persistence failures are logged and
//! swallowed: a turn is never lost from the console because a save
//! failed, and the next append retries with the complete log.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use lc_client::{ConsoleBackend, SessionSnapshot};
use lc_domain::trace::TraceEvent;
use lc_domain::{Confidence, Message, TokenUsage, Turn};

use crate::totals::SessionTotals;

enum PersistJob {
    Save(SessionSnapshot),
    Delete,
    Flush(oneshot::Sender<()>),
}

struct StoreState {
    turns: Vec<Turn>,
    history: Vec<Message>,
    /// Bumped by every clear; an upgrade started before a clear must not
    /// land on the new log.
    generation: u64,
    hydrated: bool,
}

struct StoreInner {
    backend: Arc<dyn ConsoleBackend>,
    state: Mutex<StoreState>,
    totals: SessionTotals,
    queue: mpsc::UnboundedSender<PersistJob>,
}

/// Ordered log of completed turns plus the flattened message history
/// and the session token total.
#[derive(Clone)]
pub struct TurnStore {
    inner: Arc<StoreInner>,
}

impl TurnStore {
    /// Create an empty store and spawn its persister task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(backend: Arc<dyn ConsoleBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_persister(backend.clone(), rx));

        Self {
            inner: Arc::new(StoreInner {
                backend,
                state: Mutex::new(StoreState {
                    turns: Vec::new(),
                    history: Vec::new(),
                    generation: 0,
                    hydrated: false,
                }),
                totals: SessionTotals::new(),
                queue: tx,
            }),
        }
    }

    // ── reads ────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.inner.state.lock().turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn turn(&self, index: usize) -> Option<Turn> {
        self.inner.state.lock().turns.get(index).cloned()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.inner.state.lock().turns.clone()
    }

    pub fn history(&self) -> Vec<Message> {
        self.inner.state.lock().history.clone()
    }

    pub fn session_tokens(&self) -> u64 {
        self.inner.totals.get()
    }

    pub fn totals(&self) -> &SessionTotals {
        &self.inner.totals
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    /// The full persisted representation of the current log.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        Self::snapshot_of(&state, &self.inner.totals)
    }

    fn snapshot_of(state: &StoreState, totals: &SessionTotals) -> SessionSnapshot {
        SessionSnapshot {
            turns: state.turns.clone(),
            history: state.history.clone(),
            session_tokens: totals.get(),
        }
    }

    // ── remote sync ──────────────────────────────────────────────────

    /// Hydrate from the saved session. Returns the number of turns loaded.
    ///
    /// Fails open: a transport or parse failure is logged and the store
    /// stays empty. Hydration happens at most once, and never over a log
    /// that already has content.
    pub async fn load(&self) -> usize {
        let snapshot = match self.inner.backend.load_session().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("no saved session");
                return 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load saved session, starting empty");
                return 0;
            }
        };

        let mut state = self.inner.state.lock();
        if state.hydrated || !state.turns.is_empty() || !state.history.is_empty() {
            tracing::debug!("store already populated, ignoring saved session");
            return 0;
        }
        state.hydrated = true;
        state.turns = snapshot.turns;
        state.history = snapshot.history;
        self.inner.totals.set(snapshot.session_tokens);

        let turns = state.turns.len();
        TraceEvent::SessionLoaded {
            turns,
            session_tokens: snapshot.session_tokens,
        }
        .emit();
        turns
    }

    // ── mutations ────────────────────────────────────────────────────

    /// Append a message to the flattened history. Not persisted on its
    /// own; the next append carries it.
    pub fn push_message(&self, message: Message) {
        self.inner.state.lock().history.push(message);
    }

    /// Append a completed turn, add its tokens to the session total and
    /// queue a save. Returns the turn's index.
    pub fn append(&self, turn: Turn) -> usize {
        let mut state = self.inner.state.lock();
        self.inner.totals.add(turn.tokens_spent());
        state.turns.push(turn);
        let index = state.turns.len() - 1;
        self.queue_save(&state);
        index
    }

    /// Replace turn `index`'s heuristic confidence with `confidence` and
    /// record the usage the verification cost.
    ///
    /// Returns the new session total, or `None` when the log was cleared
    /// since `generation` or the turn is no longer eligible.
    pub fn upgrade_confidence(
        &self,
        generation: u64,
        index: usize,
        confidence: Confidence,
        usage: Option<TokenUsage>,
    ) -> Option<u64> {
        let mut state = self.inner.state.lock();
        if state.generation != generation {
            tracing::debug!(index, "log cleared during verification, dropping upgrade");
            return None;
        }
        let turn = state.turns.get_mut(index)?;
        if !turn.can_verify() {
            return None;
        }

        turn.confidence = Some(confidence);
        turn.verification_usage = usage;
        let total = self
            .inner
            .totals
            .add(usage.map(|u| u.total_tokens).unwrap_or(0));
        self.queue_save(&state);
        Some(total)
    }

    /// Empty the log, reset the session total and queue a remote delete.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.turns.clear();
        state.history.clear();
        state.generation += 1;
        self.inner.totals.reset();
        let _ = self.inner.queue.send(PersistJob::Delete);

        TraceEvent::SessionCleared {
            generation: state.generation,
        }
        .emit();
    }

    /// Wait until every persistence job queued so far has been attempted.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.queue.send(PersistJob::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn queue_save(&self, state: &StoreState) {
        let snapshot = Self::snapshot_of(state, &self.inner.totals);
        let _ = self.inner.queue.send(PersistJob::Save(snapshot));
    }
}

async fn run_persister(
    backend: Arc<dyn ConsoleBackend>,
    mut rx: mpsc::UnboundedReceiver<PersistJob>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            PersistJob::Save(snapshot) => match backend.save_session(&snapshot).await {
                Ok(()) => TraceEvent::SessionSaved {
                    turns: snapshot.turns.len(),
                    session_tokens: snapshot.session_tokens,
                }
                .emit(),
                Err(e) => tracing::warn!(error = %e, "failed to save session history"),
            },
            PersistJob::Delete => {
                if let Err(e) = backend.delete_session().await {
                    tracing::warn!(error = %e, "failed to delete session history");
                }
            }
            PersistJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("session persister stopped");
}
