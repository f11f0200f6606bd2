use serde::{Deserialize, Serialize};

use crate::capability::ModelCapabilities;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context window
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fallback window sizing used when a provider does not advertise
/// capabilities, plus the knobs of the character heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "d_128000")]
    pub context_capacity: u32,
    #[serde(default = "d_4096")]
    pub reserved_output_tokens: u32,
    #[serde(default = "d_1000")]
    pub safety_margin: u32,
    /// Fixed cost charged per message by the heuristic.
    #[serde(default = "d_10")]
    pub per_message_overhead: usize,
    /// Characters per size unit. `1` treats every character as a unit,
    /// which overestimates and therefore stays on the safe side.
    #[serde(default = "d_1")]
    pub chars_per_unit: usize,
}

impl WindowConfig {
    pub fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            context_capacity: self.context_capacity,
            reserved_output_tokens: self.reserved_output_tokens,
            safety_margin: Some(self.safety_margin),
            supports_tools: true,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            context_capacity: 128_000,
            reserved_output_tokens: 4_096,
            safety_margin: 1_000,
            per_message_overhead: 10,
            chars_per_unit: 1,
        }
    }
}

fn d_128000() -> u32 {
    128_000
}
fn d_4096() -> u32 {
    4_096
}
fn d_1000() -> u32 {
    1_000
}
fn d_10() -> usize {
    10
}
fn d_1() -> usize {
    1
}
