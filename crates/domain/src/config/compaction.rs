use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-loop compaction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compaction keeps the running transcript of a single loop run under
/// `threshold` by folding its middle into a synopsis and by capping the
/// size of tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Running transcript size (in size units) that triggers compaction.
    #[serde(default = "d_60000")]
    pub threshold: usize,
    /// Messages at the start of the transcript that are never folded.
    #[serde(default = "d_1")]
    pub anchor_head: usize,
    /// Messages at the end of the transcript that are never folded.
    #[serde(default = "d_4")]
    pub anchor_tail: usize,
    /// Cap for a single tool result while under the threshold.
    #[serde(default = "d_8000")]
    pub tool_result_max_chars: usize,
    /// Cap for a single tool result once the transcript is over threshold.
    #[serde(default = "d_300")]
    pub tool_result_min_chars: usize,
    #[serde(default = "d_marker")]
    pub truncation_marker: String,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 60_000,
            anchor_head: 1,
            anchor_tail: 4,
            tool_result_max_chars: 8_000,
            tool_result_min_chars: 300,
            truncation_marker: d_marker(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rolling session summaries
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session-scoped folding of old transcript spans into persisted epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Uncovered raw messages tolerated before a new epoch is cut.
    #[serde(default = "d_10")]
    pub threshold: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 10,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_60000() -> usize {
    60_000
}
fn d_1() -> usize {
    1
}
fn d_4() -> usize {
    4
}
fn d_10() -> usize {
    10
}
fn d_8000() -> usize {
    8_000
}
fn d_300() -> usize {
    300
}
fn d_marker() -> String {
    "…[truncated]".into()
}
