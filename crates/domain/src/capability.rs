use serde::{Deserialize, Serialize};

/// Safety margin applied when a model does not advertise its own.
pub const DEFAULT_SAFETY_MARGIN: u32 = 1000;

/// Capability descriptor every {provider, model} advertises.
///
/// The execution loop derives its per-step window budget from these
/// numbers; they are approximate size units, not exact token counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Absolute context capacity of the model.
    pub context_capacity: u32,
    /// Room kept free for the model's reply.
    pub reserved_output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_margin: Option<u32>,
    #[serde(default = "d_true")]
    pub supports_tools: bool,
}

impl ModelCapabilities {
    pub fn new(context_capacity: u32, reserved_output_tokens: u32) -> Self {
        Self {
            context_capacity,
            reserved_output_tokens,
            safety_margin: None,
            supports_tools: true,
        }
    }

    /// `context_capacity − reserved_output_tokens − safety_margin`.
    pub fn budget(&self) -> usize {
        let margin = self.safety_margin.unwrap_or(DEFAULT_SAFETY_MARGIN);
        self.context_capacity
            .saturating_sub(self.reserved_output_tokens)
            .saturating_sub(margin) as usize
    }
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self::new(128_000, 4_096)
    }
}

fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_subtracts_reserve_and_default_margin() {
        let caps = ModelCapabilities::new(10_000, 2_000);
        assert_eq!(caps.budget(), 7_000);
    }

    #[test]
    fn budget_uses_explicit_margin_and_saturates() {
        let mut caps = ModelCapabilities::new(1_000, 900);
        caps.safety_margin = Some(50);
        assert_eq!(caps.budget(), 50);

        caps.safety_margin = Some(500);
        assert_eq!(caps.budget(), 0);
    }
}
