//! `lc-client`: console backend client crate.
//!
//! Provides the [`ConsoleBackend`] trait that abstracts over the console
//! backend's HTTP API, a production REST implementation
//! ([`RestConsoleClient`]) and the typed DTOs of the request/response
//! contract.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use lc_domain::config::ClientConfig;
//! use lc_client::{ChatRequest, ConsoleBackend, RestConsoleClient};
//!
//! # async fn example() -> lc_domain::error::Result<()> {
//! let client = RestConsoleClient::new(&ClientConfig::default())?;
//!
//! let resp = client
//!     .chat(ChatRequest {
//!         message: "list users".into(),
//!         history: vec![],
//!     })
//!     .await?;
//!
//! println!("{} ({} tool calls)", resp.reply, resp.tool_calls.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use backend::ConsoleBackend;
pub use rest::{from_reqwest, RestConsoleClient};
pub use types::{
    ChatRequest, ChatResponse, ControlsStatus, ProviderConfig, ProviderInfo, ProvidersResponse,
    ServiceAction, SessionSnapshot, StatusReport, ToggleRequest, ToolInfo, ToolsResponse,
    VerifyRequest, VerifyResponse,
};

use std::sync::Arc;

use lc_domain::config::ClientConfig;
use lc_domain::error::Result;

/// Build the shared backend handle used by the session core.
pub fn create_backend(cfg: &ClientConfig) -> Result<Arc<dyn ConsoleBackend>> {
    let client = RestConsoleClient::new(cfg)?;
    tracing::info!(
        base_url = %client.base_url(),
        timeout_ms = ?cfg.request_timeout_ms,
        "console backend client ready"
    );
    Ok(Arc::new(client))
}
