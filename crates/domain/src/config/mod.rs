mod agent;
mod compaction;
mod memory;
mod observability;
mod sessions;
mod window;

pub use agent::*;
pub use compaction::*;
pub use memory::*;
pub use observability::*;
pub use sessions::*;
pub use window::*;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Root of `config.toml`. Every section falls back to its defaults, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default)]
    pub rolling: RollingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Reject combinations that would make the runtime misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(Error::Config("agent.max_steps must be at least 1".into()));
        }
        if self.window.chars_per_unit == 0 {
            return Err(Error::Config("window.chars_per_unit must be at least 1".into()));
        }
        if self.window.capabilities().budget() == 0 {
            return Err(Error::Config(
                "window budget is zero: context_capacity must exceed \
                 reserved_output_tokens + safety_margin"
                    .into(),
            ));
        }
        if self.compaction.tool_result_min_chars > self.compaction.tool_result_max_chars {
            return Err(Error::Config(
                "compaction.tool_result_min_chars must not exceed tool_result_max_chars".into(),
            ));
        }
        if self.rolling.enabled && self.rolling.threshold == 0 {
            return Err(Error::Config("rolling.threshold must be at least 1".into()));
        }
        Ok(())
    }
}
