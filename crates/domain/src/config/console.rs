use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Terminal front-end
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Readline history file. Defaults to `~/.labconsole/history.txt`.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    /// Replay the saved session on startup.
    #[serde(default = "d_true")]
    pub restore_on_start: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            restore_on_start: true,
        }
    }
}

fn d_true() -> bool {
    true
}
