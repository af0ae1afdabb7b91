use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Logging and OpenTelemetry export for the interactive console.
///
/// The chat REPL owns the terminal, so its structured JSON log goes to
/// `log_file` when one is set (stderr otherwise). Setting
/// `otlp_endpoint` additionally exports every `tracing` span over
/// OTLP/gRPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Append JSON log lines here instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// OTLP gRPC endpoint (e.g. `http://localhost:4317`).
    /// When `None`, OpenTelemetry export is disabled.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// The `service.name` resource attribute reported to the collector.
    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Trace sampling rate (`0.0` = never, `1.0` = always).
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
        }
    }
}

impl ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset: verbose
    /// when logging to a file, quiet when sharing the terminal.
    pub fn default_filter(&self) -> &'static str {
        if self.log_file.is_some() {
            "info,lc_session=debug,lc_client=debug"
        } else {
            "warn"
        }
    }
}

fn d_service_name() -> String {
    "labconsole".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_log_to_stderr_without_export() {
        let cfg = ObservabilityConfig::default();
        assert!(cfg.log_file.is_none());
        assert!(cfg.otlp_endpoint.is_none());
        assert_eq!(cfg.service_name, "labconsole");
        assert_eq!(cfg.default_filter(), "warn");
    }

    #[test]
    fn log_file_raises_default_verbosity() {
        let cfg: ObservabilityConfig =
            toml::from_str(r#"log_file = "/tmp/labconsole.log""#).unwrap();
        assert_eq!(
            cfg.log_file.as_deref(),
            Some(std::path::Path::new("/tmp/labconsole.log"))
        );
        assert!(cfg.default_filter().starts_with("info"));
        assert!((cfg.sample_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn otlp_section_parses() {
        let cfg: ObservabilityConfig = toml::from_str(
            r#"
            otlp_endpoint = "http://localhost:4317"
            service_name = "lab-a"
            sample_rate = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
        assert_eq!(cfg.service_name, "lab-a");
        assert!((cfg.sample_rate - 0.5).abs() < f64::EPSILON);
    }
}
