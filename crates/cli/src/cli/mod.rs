pub mod config;
pub mod context;
pub mod memory;
pub mod sessions;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pv_domain::config::Config;

/// Palaver: inspect agent sessions, context windows and memory.
#[derive(Debug, Parser)]
#[command(name = "palaver", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Inspect stored sessions.
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Print the view and window the loop would see for a session.
    Context {
        session_id: String,
        /// Output as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Read or search durable memory.
    #[command(subcommand)]
    Memory(MemoryCommand),
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

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List sessions, most recently updated first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a session's raw transcript and rolling summaries.
    Show {
        session_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a session.
    Delete { session_id: String },
}

#[derive(Debug, Subcommand)]
pub enum MemoryCommand {
    /// Print the fact stored under `category/key`.
    Get { category: String, key: String },
    /// Case-insensitive search across stored facts.
    Search {
        query: String,
        /// Restrict the search to one category.
        #[arg(long)]
        category: Option<String>,
    },
    /// List the keys of a category.
    List { category: String },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `PV_CONFIG` (or `config.toml`
/// by default). Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("PV_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Parse `path`, falling back to defaults when the file does not exist.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
