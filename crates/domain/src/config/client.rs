use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Console backend connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL the endpoint paths (`/chat`, `/status`, ...) are joined to.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Per-request timeout. `None` (the default) means requests wait until
    /// they complete or are cancelled.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Sent as `X-Client-Type` on every request.
    #[serde(default = "d_client_name")]
    pub client_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            request_timeout_ms: None,
            client_name: d_client_name(),
        }
    }
}

fn d_base_url() -> String {
    "http://127.0.0.1:3001/api".into()
}
fn d_client_name() -> String {
    "labconsole".into()
}
