use serde::{Deserialize, Serialize};

/// A tool invocation reported by the reply endpoint.
///
/// Opaque to the console beyond pass-through: the server decides which
/// tools ran, with what arguments, and what they returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
    #[serde(default)]
    pub result: Option<String>,
}

/// A message in the running conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into() }
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_tolerates_missing_result() {
        let tc: ToolCall =
            serde_json::from_str(r#"{"name":"list_users","arguments":{"limit":5}}"#).unwrap();
        assert_eq!(tc.name, "list_users");
        assert_eq!(tc.arguments["limit"], 5);
        assert!(tc.result.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
