//! The persisted session record and its rolling summaries.

use chrono::{DateTime, Utc};
use pv_domain::error::{Error, Result};
use pv_domain::tool::{Message, Role};
use serde::{Deserialize, Serialize};

/// Metadata key holding the display title.
pub const METADATA_TITLE: &str = "title";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RollingSummary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One folded epoch: `content` stands in for raw messages
/// `start_index..=end_index` in assembled views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingSummary {
    pub content: String,
    pub start_index: usize,
    pub end_index: usize,
    /// The span held nothing worth retaining.
    #[serde(default)]
    pub low_information: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RollingSummary {
    pub fn new(content: impl Into<String>, start_index: usize, end_index: usize) -> Self {
        Self {
            content: content.into(),
            start_index,
            end_index,
            low_information: false,
            created_at: Utc::now(),
        }
    }

    pub fn low_information(mut self, yes: bool) -> Self {
        self.low_information = yes;
        self
    }

    /// Number of raw messages covered.
    pub fn span_len(&self) -> usize {
        self.end_index + 1 - self.start_index
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SessionRecord
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything persisted for one session.
///
/// `messages` and `rolling_summaries` only ever grow; nothing here
/// rewrites an existing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub rolling_summaries: Vec<RollingSummary>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            rolling_summaries: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata
            .insert(METADATA_TITLE.into(), serde_json::Value::String(title.into()));
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get(METADATA_TITLE).and_then(|v| v.as_str())
    }

    pub fn append_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        let before = self.messages.len();
        self.messages.extend(messages);
        if self.messages.len() != before {
            self.touch();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a new epoch. It must start exactly where coverage ends and
    /// must lie inside the raw transcript.
    pub fn push_summary(&mut self, summary: RollingSummary) -> Result<()> {
        let expected = self.first_uncovered_index();
        if summary.start_index != expected {
            return Err(Error::Session(format!(
                "rolling summary must start at {expected}, got {}",
                summary.start_index
            )));
        }
        if summary.end_index < summary.start_index {
            return Err(Error::Session(format!(
                "rolling summary range {}..={} is empty",
                summary.start_index, summary.end_index
            )));
        }
        if summary.end_index >= self.messages.len() {
            return Err(Error::Session(format!(
                "rolling summary ends at {} past the transcript ({} messages)",
                summary.end_index,
                self.messages.len()
            )));
        }
        self.rolling_summaries.push(summary);
        self.touch();
        Ok(())
    }

    /// Whether `messages[0]` is a leading system message kept verbatim in
    /// every assembled view and never folded.
    pub fn has_leading_system(&self) -> bool {
        self.messages.first().is_some_and(|m| m.role == Role::System)
    }

    /// First raw index not covered by any summary.
    pub fn first_uncovered_index(&self) -> usize {
        match self.rolling_summaries.last() {
            Some(s) => s.end_index + 1,
            None if self.has_leading_system() => 1,
            None => 0,
        }
    }

    /// Raw messages not yet covered by a summary.
    pub fn uncovered(&self) -> &[Message] {
        let start = self.first_uncovered_index().min(self.messages.len());
        &self.messages[start..]
    }

    /// Text of the first user message, for listings.
    pub fn preview(&self, max_chars: usize) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| pv_domain::text::truncate_chars(&m.content, max_chars, "…").0)
    }
}
