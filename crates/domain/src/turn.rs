use serde::{Deserialize, Serialize};

use crate::confidence::{can_upgrade, Confidence};
use crate::tool::ToolCall;
use crate::usage::TokenUsage;

/// One completed user-message/assistant-reply exchange.
///
/// Persisted in camelCase as part of the session snapshot. The only field
/// that changes after the turn is appended is `confidence` (heuristic →
/// verified), together with the `verification_usage` it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub user_text: String,
    pub reply: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_usage: Option<TokenUsage>,
}

impl Turn {
    pub fn can_verify(&self) -> bool {
        can_upgrade(self.confidence.as_ref(), &self.tool_calls)
    }

    /// Tokens this turn contributed to the session total, including a
    /// completed verification.
    pub fn tokens_spent(&self) -> u64 {
        let reply = self.token_usage.map(|u| u.total_tokens).unwrap_or(0);
        let verify = self.verification_usage.map(|u| u.total_tokens).unwrap_or(0);
        reply + verify
    }
}
