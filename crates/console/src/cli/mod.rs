pub mod chat;
pub mod config;
pub mod status;

use std::path::Path;

use clap::{Parser, Subcommand};

use lc_domain::config::Config;

/// labconsole: terminal console for the lab's chat and tool services.
#[derive(Debug, Parser)]
#[command(name = "labconsole", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat {
        /// Start with an empty session instead of restoring the saved one.
        #[arg(long)]
        fresh: bool,
    },
    /// Poll service status once and print it.
    Status {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `LC_CONFIG` (or
/// `labconsole.toml` by default). Returns the parsed [`Config`] and the
/// path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("LC_CONFIG").unwrap_or_else(|_| "labconsole.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

/// Parse `path`, or fall back to defaults when the file does not exist.
pub fn load_config_from(path: &str) -> anyhow::Result<Config> {
    if !Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
