use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status poller cadence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Next poll delay when every service is online.
    #[serde(default = "d_30000")]
    pub healthy_interval_ms: u64,
    /// Next poll delay when at least one service is offline.
    #[serde(default = "d_3000")]
    pub degraded_interval_ms: u64,
    /// Next poll delay after the status request itself failed.
    #[serde(default = "d_5000")]
    pub failure_interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            healthy_interval_ms: 30_000,
            degraded_interval_ms: 3_000,
            failure_interval_ms: 5_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_30000() -> u64 {
    30_000
}
fn d_3000() -> u64 {
    3_000
}
fn d_5000() -> u64 {
    5_000
}
