//! `lc-domain`: shared data model, error type, configuration and trace
//! events for the lab console crates.

pub mod config;
pub mod confidence;
pub mod error;
pub mod status;
pub mod tool;
pub mod trace;
pub mod turn;
pub mod usage;

pub use confidence::{Assessment, Confidence, ConfidenceSource, Verification, VerificationStatus};
pub use status::{ServiceState, ServiceStatus, StatusSnapshot};
pub use tool::{Message, Role, ToolCall};
pub use turn::Turn;
pub use usage::TokenUsage;
