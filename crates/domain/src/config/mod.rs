mod client;
mod console;
mod observability;
mod poller;

pub use client::*;
pub use console::*;
pub use observability::*;
pub use poller::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.client.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "client.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "client.base_url".into(),
                message: "base_url must start with http:// or https://".into(),
            });
        }

        if self.client.request_timeout_ms == Some(0) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "client.request_timeout_ms".into(),
                message: "timeout must be greater than 0 (omit it to disable)".into(),
            });
        }

        for (field, value) in [
            ("poller.healthy_interval_ms", self.poller.healthy_interval_ms),
            ("poller.degraded_interval_ms", self.poller.degraded_interval_ms),
            ("poller.failure_interval_ms", self.poller.failure_interval_ms),
        ] {
            if value == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "interval must be greater than 0".into(),
                });
            }
        }

        // Degraded is the fast cadence.
        if self.poller.degraded_interval_ms > self.poller.healthy_interval_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "poller.degraded_interval_ms".into(),
                message: "degraded interval is longer than the healthy interval".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "observability.sample_rate".into(),
                message: "sample_rate should be between 0.0 and 1.0".into(),
            });
        }

        errors
    }
}
