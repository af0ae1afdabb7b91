//! Scripted `ConsoleBackend` shared by the session integration suites.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use lc_client::{
    ChatRequest, ChatResponse, ConsoleBackend, ControlsStatus, ProviderConfig, ProvidersResponse,
    SessionSnapshot, StatusReport, ToggleRequest, ToolsResponse, VerifyRequest, VerifyResponse,
};
use lc_domain::error::{Error, Result};
use lc_domain::{ServiceState, ServiceStatus};
use lc_session::ConsoleEvent;

/// One scripted answer.
pub enum Script<T> {
    Reply(T),
    Fail(Error),
    /// Never answers; only cancellation ends the call.
    Hang,
    /// Answers once the gate is opened.
    Gated(Arc<Notify>, T),
}

impl<T> Script<T> {
    async fn play(self) -> Result<T> {
        match self {
            Script::Reply(v) => Ok(v),
            Script::Fail(e) => Err(e),
            Script::Hang => std::future::pending().await,
            Script::Gated(gate, v) => {
                gate.notified().await;
                Ok(v)
            }
        }
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    chat: Mutex<VecDeque<Script<ChatResponse>>>,
    verify: Mutex<VecDeque<Script<VerifyResponse>>>,
    status: Mutex<VecDeque<Script<StatusReport>>>,

    /// The "remote" session history.
    pub saved: Mutex<Option<SessionSnapshot>>,
    pub fail_saves: AtomicBool,
    pub fail_loads: AtomicBool,

    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub chat_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_chat(&self, s: Script<ChatResponse>) {
        self.chat.lock().push_back(s);
    }

    pub fn push_verify(&self, s: Script<VerifyResponse>) {
        self.verify.lock().push_back(s);
    }

    pub fn push_status(&self, s: Script<StatusReport>) {
        self.status.lock().push_back(s);
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsoleBackend for ScriptedBackend {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection refused".into()));
        }
        Ok(self.saved.lock().clone().filter(|s| !s.is_empty()))
    }

    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Server {
                status: 500,
                detail: "disk full".into(),
            });
        }
        *self.saved.lock() = Some(snapshot.clone());
        Ok(())
    }

    async fn delete_session(&self) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        *self.saved.lock() = None;
        Ok(())
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chat_requests.lock().push(req);
        let script = self.chat.lock().pop_front();
        match script {
            Some(s) => s.play().await,
            None => Err(Error::Other("no scripted chat reply".into())),
        }
    }

    async fn verify(&self, _req: VerifyRequest) -> Result<VerifyResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.verify.lock().pop_front();
        match script {
            Some(s) => s.play().await,
            None => Err(Error::Other("no scripted verify reply".into())),
        }
    }

    async fn status(&self) -> Result<StatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.status.lock().pop_front();
        match script {
            Some(s) => s.play().await,
            None => Err(Error::Transport("connection refused".into())),
        }
    }

    async fn providers(&self) -> Result<ProvidersResponse> {
        Err(Error::Other("not scripted".into()))
    }

    async fn set_provider(&self, _cfg: ProviderConfig) -> Result<()> {
        Err(Error::Other("not scripted".into()))
    }

    async fn tools(&self) -> Result<ToolsResponse> {
        Ok(ToolsResponse::default())
    }

    async fn controls(&self) -> Result<ControlsStatus> {
        Ok(ControlsStatus {
            enabled: false,
            reason: None,
        })
    }

    async fn toggle_service(&self, _req: ToggleRequest) -> Result<()> {
        Ok(())
    }
}

// ── fixtures ─────────────────────────────────────────────────────────

/// The "list users" reply: one tool call, heuristic confidence, 70 tokens.
pub fn list_users_reply() -> ChatResponse {
    serde_json::from_value(serde_json::json!({
        "reply": "3 users found",
        "tool_calls": [{"name": "list_users", "arguments": {}, "result": "[...]"}],
        "confidence": {"score": 0.4, "label": "Low", "source": "heuristic"},
        "token_usage": {"input_tokens": 50, "output_tokens": 20, "total_tokens": 70}
    }))
    .unwrap()
}

pub fn plain_reply(text: &str, tokens: u64) -> ChatResponse {
    serde_json::from_value(serde_json::json!({
        "reply": text,
        "tool_calls": [],
        "token_usage": {"input_tokens": tokens, "output_tokens": 0, "total_tokens": tokens}
    }))
    .unwrap()
}

pub fn verified(score: f64, tokens: u64) -> VerifyResponse {
    serde_json::from_value(serde_json::json!({
        "confidence": {"score": score, "label": "High", "source": "llm"},
        "explanation": "all claims match tool output",
        "token_usage": {"input_tokens": tokens, "output_tokens": 0}
    }))
    .unwrap()
}

pub fn service(name: &str, online: bool, tools: usize) -> ServiceStatus {
    ServiceStatus {
        name: name.into(),
        port: Some(8000),
        status: if online {
            ServiceState::Online
        } else {
            ServiceState::Offline
        },
        tool_count: tools,
        tools: (0..tools).map(|i| format!("{name}_tool_{i}")).collect(),
    }
}

pub fn report(services: Vec<ServiceStatus>) -> StatusReport {
    let online_count = services.iter().filter(|s| s.is_online()).count();
    let total_tools = services.iter().map(|s| s.tool_count).sum();
    StatusReport {
        servers: services,
        total_tools,
        online_count,
        engine: Some("docker".into()),
        error: None,
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> Vec<ConsoleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
