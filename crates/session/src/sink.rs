//! Presentation boundary.
//!
//! The session core never renders anything itself; every observable
//! effect goes through a [`ConsoleSink`]. The terminal front-end is one
//! implementation, [`ChannelSink`] (events over an mpsc channel) is
//! another.

use serde::Serialize;
use tokio::sync::mpsc;

use lc_domain::{Confidence, StatusSnapshot, TokenUsage, ToolCall};

/// Category of a failure surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The backend answered with an error body; the message is its `detail`.
    Server,
    /// The backend could not be reached.
    Network,
    /// The user stopped the turn. Informational.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Receives structured events from the controller and the poller.
///
/// Methods are called from tokio tasks and must not block.
pub trait ConsoleSink: Send + Sync {
    fn on_user_message(&self, text: &str);

    fn on_tool_calls(&self, calls: &[ToolCall]);

    fn on_assistant_message(&self, text: &str);

    /// `turn_index` is the turn's position in the log, so a later upgrade
    /// can be matched to what was rendered.
    fn on_confidence(&self, turn_index: usize, confidence: &Confidence);

    /// `session_total` is the session token counter after `usage` was added.
    fn on_token_usage(&self, usage: &TokenUsage, session_total: u64);

    fn on_status_change(&self, snapshot: &StatusSnapshot);

    /// The number of online services changed between two successful polls.
    fn on_services_changed(&self, previous: usize, current: usize);

    fn on_error(&self, kind: ErrorKind, message: &str);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel sink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One sink call, as a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleEvent {
    UserMessage {
        text: String,
    },
    ToolCalls {
        calls: Vec<ToolCall>,
    },
    AssistantMessage {
        text: String,
    },
    Confidence {
        turn_index: usize,
        confidence: Confidence,
    },
    TokenUsage {
        usage: TokenUsage,
        session_total: u64,
    },
    StatusChange {
        snapshot: StatusSnapshot,
    },
    ServicesChanged {
        previous: usize,
        current: usize,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Forwards every sink call as a [`ConsoleEvent`] over an unbounded
/// channel. Sends after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ConsoleEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ConsoleEvent) {
        let _ = self.tx.send(event);
    }
}

impl ConsoleSink for ChannelSink {
    fn on_user_message(&self, text: &str) {
        self.send(ConsoleEvent::UserMessage { text: text.to_owned() });
    }

    fn on_tool_calls(&self, calls: &[ToolCall]) {
        self.send(ConsoleEvent::ToolCalls { calls: calls.to_vec() });
    }

    fn on_assistant_message(&self, text: &str) {
        self.send(ConsoleEvent::AssistantMessage { text: text.to_owned() });
    }

    fn on_confidence(&self, turn_index: usize, confidence: &Confidence) {
        self.send(ConsoleEvent::Confidence {
            turn_index,
            confidence: confidence.clone(),
        });
    }

    fn on_token_usage(&self, usage: &TokenUsage, session_total: u64) {
        self.send(ConsoleEvent::TokenUsage {
            usage: *usage,
            session_total,
        });
    }

    fn on_status_change(&self, snapshot: &StatusSnapshot) {
        self.send(ConsoleEvent::StatusChange {
            snapshot: snapshot.clone(),
        });
    }

    fn on_services_changed(&self, previous: usize, current: usize) {
        self.send(ConsoleEvent::ServicesChanged { previous, current });
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        self.send(ConsoleEvent::Error {
            kind,
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.on_user_message("hi");
        sink.on_assistant_message("hello");
        sink.on_error(ErrorKind::Network, "down");

        assert_eq!(rx.try_recv().unwrap(), ConsoleEvent::UserMessage { text: "hi".into() });
        assert_eq!(
            rx.try_recv().unwrap(),
            ConsoleEvent::AssistantMessage { text: "hello".into() }
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            ConsoleEvent::Error { kind: ErrorKind::Network, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_receiver_dropped_is_ignored() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_services_changed(2, 3);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(ConsoleEvent::ServicesChanged {
            previous: 1,
            current: 2,
        })
        .unwrap();
        assert_eq!(json["type"], "services_changed");
        assert_eq!(ErrorKind::Cancelled.as_str(), "cancelled");
    }
}
