//! Session-scoped rolling summaries.
//!
//! Before each turn the oldest uncovered span of the raw transcript may be
//! folded into a new epoch. The raw transcript is never touched; epochs
//! only change how the view sent to the loop is assembled.

use std::ops::Range;
use std::sync::Arc;

use pv_domain::config::RollingConfig;
use pv_domain::error::Result;
use pv_domain::tool::Message;
use pv_domain::trace::TraceEvent;
use pv_sessions::{RollingSummary, SessionRecord};

use crate::blocks::chunk_ranges;
use crate::summarizer::{Summarizer, Synopsis};

pub const FUSED_SUMMARY_HEADER: &str = "[Summary of earlier conversation in this session]";

/// Content recorded for an epoch whose span held no key facts.
pub const LOW_INFORMATION_EPOCH: &str = "No information worth retaining.";

pub struct RollingSummaryManager {
    summarizer: Option<Arc<dyn Summarizer>>,
    config: RollingConfig,
}

impl RollingSummaryManager {
    pub fn new(summarizer: Option<Arc<dyn Summarizer>>, config: RollingConfig) -> Self {
        Self { summarizer, config }
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled && self.summarizer.is_some()
    }

    /// The raw range the next epoch would cover, if one is due.
    ///
    /// The newest message is never folded, and the span ends on a block
    /// boundary so a tool exchange is folded whole or not at all.
    pub fn span_to_roll(&self, record: &SessionRecord) -> Option<Range<usize>> {
        let len = record.messages.len();
        let first = record.first_uncovered_index();
        if len <= first || len - first <= self.config.threshold {
            return None;
        }
        let end = chunk_ranges(&record.messages)
            .iter()
            .map(|r| r.end)
            .filter(|&end| end < len)
            .max()?;
        (end > first).then_some(first..end)
    }

    /// Cut a new epoch when one is due. A summarizer error leaves the
    /// record untouched.
    pub async fn maybe_roll(&self, record: &mut SessionRecord) -> Result<Option<RollingSummary>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(summarizer) = &self.summarizer else {
            return Ok(None);
        };
        let Some(span) = self.span_to_roll(record) else {
            return Ok(None);
        };

        let prior = prior_context(record);
        let synopsis = summarizer
            .summarize(&record.messages[span.clone()], prior.as_deref())
            .await?;

        let summary = match synopsis {
            Synopsis::Text(text) => RollingSummary::new(text, span.start, span.end - 1),
            Synopsis::NoKeyFacts => {
                RollingSummary::new(LOW_INFORMATION_EPOCH, span.start, span.end - 1)
                    .low_information(true)
            }
        };
        record.push_summary(summary.clone())?;

        TraceEvent::RollingSummaryCreated {
            session_id: record.session_id.clone(),
            start_index: summary.start_index,
            end_index: summary.end_index,
            low_information: summary.low_information,
        }
        .emit();
        Ok(Some(summary))
    }
}

fn prior_context(record: &SessionRecord) -> Option<String> {
    let parts: Vec<&str> = record
        .rolling_summaries
        .iter()
        .filter(|s| !s.low_information)
        .map(|s| s.content.as_str())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// The view handed to the loop: core memory, the leading system message,
/// one system message fusing every epoch in order, then the uncovered
/// raw messages verbatim.
pub fn assemble_view(record: &SessionRecord, core_memory: Option<Message>) -> Vec<Message> {
    let mut view = Vec::with_capacity(record.uncovered().len() + 3);
    view.extend(core_memory);
    if record.has_leading_system() {
        view.push(record.messages[0].clone());
    }
    if let Some(fused) = fused_summary(&record.rolling_summaries) {
        view.push(fused);
    }
    view.extend_from_slice(record.uncovered());
    view
}

fn fused_summary(summaries: &[RollingSummary]) -> Option<Message> {
    let informative: Vec<&RollingSummary> =
        summaries.iter().filter(|s| !s.low_information).collect();
    if informative.is_empty() {
        return None;
    }
    let mut text = String::from(FUSED_SUMMARY_HEADER);
    for (i, s) in informative.iter().enumerate() {
        text.push_str(&format!("\n\n### Part {}\n{}", i + 1, s.content.trim()));
    }
    Some(Message::system(text))
}
