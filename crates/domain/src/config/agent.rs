use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent execution loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls the think/act step loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model invocations per incoming message before the loop
    /// gives up with `abort_message`.
    #[serde(default = "d_25")]
    pub max_steps: usize,
    /// Reply used when the step cap is exhausted.
    #[serde(default = "d_abort_message")]
    pub abort_message: String,
    /// Reply used when the model invocation itself fails.
    #[serde(default = "d_failure_message")]
    pub failure_message: String,
    /// Base persona prepended to the core-memory system message.
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
    /// Minimum transcript length before a finished run is archived.
    #[serde(default = "d_10")]
    pub archive_min_messages: usize,
    /// Run the tool calls of one step concurrently.
    #[serde(default = "d_true")]
    pub concurrent_tools: bool,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            abort_message: d_abort_message(),
            failure_message: d_failure_message(),
            system_prompt: d_system_prompt(),
            archive_min_messages: 10,
            concurrent_tools: true,
            temperature: d_temperature(),
        }
    }
}

fn d_25() -> usize {
    25
}
fn d_10() -> usize {
    10
}
fn d_true() -> bool {
    true
}
fn d_temperature() -> f32 {
    0.2
}
fn d_abort_message() -> String {
    "Sorry, I tried several approaches but could not gather enough information \
     to answer, so I stopped here."
        .into()
}
fn d_failure_message() -> String {
    "Something went wrong while processing your request. Please try again later.".into()
}
fn d_system_prompt() -> String {
    "You are a capable personal assistant. When you store or search long-term \
     memory, describe people by name from a neutral third-person viewpoint, \
     never with pronouns such as \"I\" or \"you\"."
        .into()
}
