//! Data Transfer Objects for the console backend's HTTP contract.
//!
//! Chat, verification and status payloads use `snake_case` on the wire;
//! the persisted session snapshot uses `camelCase` (it is written by the
//! browser console and must stay readable by it).

use serde::{Deserialize, Serialize};

use lc_domain::{
    Assessment, Confidence, Message, ServiceStatus, StatusSnapshot, TokenUsage, ToolCall, Turn,
    Verification, VerificationStatus,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET/POST /session-history: the full persisted log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub session_tokens: u64,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.history.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// POST /chat: request body.
///
/// `history` holds the conversation *before* `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

/// POST /chat: response body.
///
/// Backends report either a scored `confidence` or a status-only
/// `verification`; [`ChatResponse::confidence`] normalizes the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl ChatResponse {
    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
            .clone()
            .or_else(|| self.verification.clone().map(Confidence::from))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Verification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// POST /verify: request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub reply: String,
    pub tool_calls: Vec<ToolCall>,
}

/// POST /verify: response body: `{ confidence | status, explanation?, token_usage? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub confidence: Option<Assessment>,
    #[serde(default)]
    pub status: Option<VerificationStatus>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
}

impl VerifyResponse {
    /// The model's verdict. A scored `confidence` wins over a bare
    /// `status`; `explanation` fills in missing details. `None` when the
    /// response carried neither.
    pub fn verdict(&self) -> Option<Assessment> {
        let explanation = self.explanation.clone().unwrap_or_default();
        if let Some(ref a) = self.confidence {
            let details = if a.details.is_empty() { explanation } else { a.details.clone() };
            return Some(Assessment::new(a.score, a.label.clone(), details));
        }
        self.status.map(|s| s.assessment(explanation))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /status: response body.
///
/// The backend answers 200 with `error` set (and no servers) when it
/// could not reach the tool servers itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub servers: Vec<ServiceStatus>,
    #[serde(default)]
    pub total_tools: usize,
    #[serde(default)]
    pub online_count: usize,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn into_snapshot(self) -> StatusSnapshot {
        StatusSnapshot::from_services(self.servers, self.engine)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Providers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requires_key: bool,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub has_key: bool,
}

/// GET /providers: response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
    #[serde(default)]
    pub active: serde_json::Value,
}

/// POST /provider: request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools + service controls
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// GET /tools: response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsResponse {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /mcp-controls: whether start/stop controls are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsStatus {
    pub enabled: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
}

/// POST /mcp/toggle: request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub service: String,
    pub action: ServiceAction,
}

/// Error payload: `{ detail }` from most endpoints, `{ error }` from the
/// service controls.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn message(self) -> Option<String> {
        self.detail.or(self.error).filter(|m| !m.is_empty())
    }
}
