//! Approximate transcript sizing.
//!
//! Sizes are abstract units comparable with [`ModelCapabilities::budget`].
//! The character heuristic is deliberately coarse; providers that can
//! count tokens locally override it through `LlmProvider::estimate_size`.
//!
//! [`ModelCapabilities::budget`]: pv_domain::capability::ModelCapabilities::budget

use std::sync::Arc;

use pv_domain::config::WindowConfig;
use pv_domain::tool::Message;
use pv_providers::LlmProvider;

pub trait SizeEstimator: Send + Sync {
    fn size_of(&self, messages: &[Message]) -> usize;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Character heuristic
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `ceil((content chars + serialized tool-call chars) / chars_per_unit)
/// + per_message_overhead`, summed per message. Additive, so the size of
/// a window equals the sum of the sizes of its blocks.
#[derive(Debug, Clone, Copy)]
pub struct CharHeuristic {
    pub per_message_overhead: usize,
    pub chars_per_unit: usize,
}

impl Default for CharHeuristic {
    fn default() -> Self {
        Self {
            per_message_overhead: 10,
            chars_per_unit: 1,
        }
    }
}

impl From<&WindowConfig> for CharHeuristic {
    fn from(cfg: &WindowConfig) -> Self {
        Self {
            per_message_overhead: cfg.per_message_overhead,
            chars_per_unit: cfg.chars_per_unit.max(1),
        }
    }
}

impl CharHeuristic {
    pub fn message_size(&self, msg: &Message) -> usize {
        let mut chars = msg.content.chars().count();
        if !msg.tool_calls.is_empty() {
            chars += serde_json::to_string(&msg.tool_calls)
                .map(|s| s.chars().count())
                .unwrap_or(0);
        }
        chars.div_ceil(self.chars_per_unit.max(1)) + self.per_message_overhead
    }
}

impl SizeEstimator for CharHeuristic {
    fn size_of(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.message_size(m)).sum()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider-backed sizing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Asks the provider first and falls back to the heuristic.
pub struct ProviderSizer {
    provider: Arc<dyn LlmProvider>,
    fallback: CharHeuristic,
}

impl ProviderSizer {
    pub fn new(provider: Arc<dyn LlmProvider>, fallback: CharHeuristic) -> Self {
        Self { provider, fallback }
    }
}

impl SizeEstimator for ProviderSizer {
    fn size_of(&self, messages: &[Message]) -> usize {
        self.provider
            .estimate_size(messages)
            .unwrap_or_else(|| self.fallback.size_of(messages))
    }
}
