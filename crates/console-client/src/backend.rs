//! The `ConsoleBackend` trait defines the interface the session core uses
//! to reach the console backend (REST, test double, ...).

use async_trait::async_trait;
use lc_domain::error::Result;

use crate::types::{
    ChatRequest, ChatResponse, ControlsStatus, ProviderConfig, ProvidersResponse,
    SessionSnapshot, StatusReport, ToggleRequest, ToolsResponse, VerifyRequest, VerifyResponse,
};

/// Abstraction over the console backend API surface.
///
/// Implementations may talk to the real REST API or be a scripted test
/// double. All methods return `lc_domain::error::Result`; a non-2xx
/// response is `Error::Server`, a network failure `Error::Transport`.
#[async_trait]
pub trait ConsoleBackend: Send + Sync {
    /// Fetch the saved session (GET /session-history). `Ok(None)` when
    /// nothing is saved.
    async fn load_session(&self) -> Result<Option<SessionSnapshot>>;

    /// Replace the saved session with a full snapshot (POST /session-history).
    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Drop the saved session (DELETE /session-history).
    async fn delete_session(&self) -> Result<()>;

    /// Send one user message with its prior history (POST /chat).
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// Ask for a model-based verification of a reply (POST /verify).
    async fn verify(&self, req: VerifyRequest) -> Result<VerifyResponse>;

    /// Service health and tool inventory (GET /status).
    async fn status(&self) -> Result<StatusReport>;

    /// Available LLM providers and the active one (GET /providers).
    async fn providers(&self) -> Result<ProvidersResponse>;

    /// Switch the active LLM provider (POST /provider).
    async fn set_provider(&self, cfg: ProviderConfig) -> Result<()>;

    /// Flat tool inventory across all online services (GET /tools).
    async fn tools(&self) -> Result<ToolsResponse>;

    /// Whether service start/stop controls are available (GET /mcp-controls).
    async fn controls(&self) -> Result<ControlsStatus>;

    /// Start or stop one tool service (POST /mcp/toggle).
    async fn toggle_service(&self, req: ToggleRequest) -> Result<()>;
}
