use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Durable memory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Root directory of the Markdown fact store.
    #[serde(default = "d_memory_dir")]
    pub dir: PathBuf,
    /// Category holding long-lived core facts.
    #[serde(default = "d_core")]
    pub core_category: String,
    /// Keys inside `core_category` injected into every assembled view.
    #[serde(default = "d_core_keys")]
    pub core_keys: Vec<String>,
    /// Category receiving archived transcript digests (one key per day).
    #[serde(default = "d_daily")]
    pub archive_category: String,
    /// Hard cap on the core-memory system message.
    #[serde(default = "d_4000")]
    pub core_max_chars: usize,
    /// Capture finished turns into semantic memory in the background.
    #[serde(default = "d_true")]
    pub auto_capture: bool,
    #[serde(default)]
    pub semantic: SemanticMemoryConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: d_memory_dir(),
            core_category: d_core(),
            core_keys: d_core_keys(),
            archive_category: d_daily(),
            core_max_chars: 4_000,
            auto_capture: true,
            semantic: SemanticMemoryConfig::default(),
        }
    }
}

/// Connection to the external semantic memory service. Disabled while
/// `base_url` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticMemoryConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_user")]
    pub user_id: String,
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    #[serde(default = "d_2")]
    pub max_retries: u32,
    /// Query used to pull profile facts into the core-memory message.
    #[serde(default = "d_core_query")]
    pub core_query: String,
    #[serde(default = "d_5")]
    pub search_limit: u32,
}

impl Default for SemanticMemoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user_id: d_user(),
            timeout_ms: 8_000,
            max_retries: 2,
            core_query: d_core_query(),
            search_limit: 5,
        }
    }
}

fn d_memory_dir() -> PathBuf {
    PathBuf::from("data/memory")
}
fn d_core() -> String {
    "core".into()
}
fn d_core_keys() -> Vec<String> {
    vec!["user_profile".into(), "agent_profile".into()]
}
fn d_daily() -> String {
    "daily".into()
}
fn d_4000() -> usize {
    4_000
}
fn d_true() -> bool {
    true
}
fn d_user() -> String {
    "default_user".into()
}
fn d_8000() -> u64 {
    8_000
}
fn d_2() -> u32 {
    2
}
fn d_5() -> u32 {
    5
}
fn d_core_query() -> String {
    "What are the user's personality, occupation, and preferences?".into()
}
