//! REST implementation of [`ConsoleBackend`].
//!
//! `RestConsoleClient` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding HTTP call. Requests are never
//! retried here: the session core decides what to do with a failure.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lc_domain::config::ClientConfig;
use lc_domain::error::{Error, Result};
use lc_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::backend::ConsoleBackend;
use crate::types::{
    ChatRequest, ChatResponse, ControlsStatus, ErrorBody, ProviderConfig, ProvidersResponse,
    SessionSnapshot, StatusReport, ToggleRequest, ToolsResponse, VerifyRequest, VerifyResponse,
};

/// Longest raw body echoed into an error when it carries no `detail`.
const MAX_RAW_DETAIL: usize = 200;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the console backend.
///
/// Created once per console and shared; the underlying `reqwest::Client`
/// maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestConsoleClient {
    http: Client,
    base_url: String,
    client_name: String,
    timeout: Option<Duration>,
}

impl RestConsoleClient {
    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a new client from the shared `ClientConfig`.
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let timeout = cfg.request_timeout_ms.map(Duration::from_millis);
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            client_name: cfg.client_name.clone(),
            timeout,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard console headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("X-Client-Type", &self.client_name)
            .header("X-Trace-Id", Uuid::new_v4().to_string())
    }

    /// Build the full URL for a path like `/chat`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and map non-2xx responses to `Error::Server`.
    ///
    /// Emits a `TraceEvent::BackendCall` for every attempt.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::BackendCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::BackendCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Server {
            status: status.as_u16(),
            detail: error_detail(status, &body),
        })
    }

    /// Read and parse a JSON body.
    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Other(format!("failed to parse {endpoint} response: {e}"))
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl ConsoleBackend for RestConsoleClient {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        let endpoint = "GET /session-history";
        let resp = match self
            .execute(endpoint, self.http.get(self.url("/session-history")))
            .await
        {
            Ok(resp) => resp,
            Err(Error::Server { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let body = resp.text().await.map_err(from_reqwest)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let snapshot: SessionSnapshot = serde_json::from_str(&body).map_err(|e| {
            Error::Persistence(format!("failed to parse saved session: {e}"))
        })?;
        Ok(Some(snapshot).filter(|s| !s.is_empty()))
    }

    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.execute(
            "POST /session-history",
            self.http.post(self.url("/session-history")).json(snapshot),
        )
        .await?;
        Ok(())
    }

    async fn delete_session(&self) -> Result<()> {
        self.execute(
            "DELETE /session-history",
            self.http.delete(self.url("/session-history")),
        )
        .await?;
        Ok(())
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let endpoint = "POST /chat";
        let resp = self
            .execute(endpoint, self.http.post(self.url("/chat")).json(&req))
            .await?;
        Self::decode(endpoint, resp).await
    }

    async fn verify(&self, req: VerifyRequest) -> Result<VerifyResponse> {
        let endpoint = "POST /verify";
        let resp = self
            .execute(endpoint, self.http.post(self.url("/verify")).json(&req))
            .await?;
        Self::decode(endpoint, resp).await
    }

    async fn status(&self) -> Result<StatusReport> {
        let endpoint = "GET /status";
        let resp = self.execute(endpoint, self.http.get(self.url("/status"))).await?;
        Self::decode(endpoint, resp).await
    }

    async fn providers(&self) -> Result<ProvidersResponse> {
        let endpoint = "GET /providers";
        let resp = self
            .execute(endpoint, self.http.get(self.url("/providers")))
            .await?;
        Self::decode(endpoint, resp).await
    }

    async fn set_provider(&self, cfg: ProviderConfig) -> Result<()> {
        self.execute(
            "POST /provider",
            self.http.post(self.url("/provider")).json(&cfg),
        )
        .await?;
        Ok(())
    }

    async fn tools(&self) -> Result<ToolsResponse> {
        let endpoint = "GET /tools";
        let resp = self.execute(endpoint, self.http.get(self.url("/tools"))).await?;
        Self::decode(endpoint, resp).await
    }

    async fn controls(&self) -> Result<ControlsStatus> {
        let endpoint = "GET /mcp-controls";
        let resp = self
            .execute(endpoint, self.http.get(self.url("/mcp-controls")))
            .await?;
        Self::decode(endpoint, resp).await
    }

    async fn toggle_service(&self, req: ToggleRequest) -> Result<()> {
        self.execute(
            "POST /mcp/toggle",
            self.http.post(self.url("/mcp/toggle")).json(&req),
        )
        .await?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Everything reqwest reports before a status line arrives (connect,
/// DNS, timeout, body read) is a transport failure.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Transport(format!("timeout: {e}"))
    } else {
        Error::Transport(e.to_string())
    }
}

/// The message to show for a non-2xx response: the server's `detail`
/// (or `error`), else a short raw body, else the status reason.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message() {
            return message;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= MAX_RAW_DETAIL && !trimmed.starts_with('{') {
        return trimmed.to_owned();
    }
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_from_json_body() {
        let d = error_detail(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"model offline"}"#);
        assert_eq!(d, "model offline");
    }

    #[test]
    fn detail_from_plain_body() {
        let d = error_detail(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(d, "upstream down");
    }

    #[test]
    fn detail_falls_back_to_reason() {
        assert_eq!(error_detail(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, r#"{"other":1}"#),
            "Internal Server Error"
        );
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let cfg = ClientConfig {
            base_url: "http://localhost:3001/api/".into(),
            ..Default::default()
        };
        let client = RestConsoleClient::new(&cfg).unwrap();
        assert_eq!(client.url("/chat"), "http://localhost:3001/api/chat");
        assert!(client.timeout().is_none());
    }

    #[test]
    fn timeout_is_optional() {
        let cfg = ClientConfig {
            request_timeout_ms: Some(1500),
            ..Default::default()
        };
        let client = RestConsoleClient::new(&cfg).unwrap();
        assert_eq!(client.timeout(), Some(Duration::from_millis(1500)));
    }
}
