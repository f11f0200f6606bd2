//! In-loop compaction: capping tool output and folding the middle of a
//! running transcript into a single synopsis message.

use std::ops::Range;
use std::sync::Arc;

use pv_domain::config::CompactionConfig;
use pv_domain::error::Result;
use pv_domain::text::truncate_chars;
use pv_domain::tool::{Message, Role};
use pv_domain::trace::TraceEvent;

use crate::blocks::chunk_ranges;
use crate::sizing::SizeEstimator;
use crate::summarizer::{Summarizer, Synopsis};

pub const FOLDED_SUMMARY_PREFIX: &str = "[Folded summary of earlier conversation]\n";

pub const LOW_INFORMATION_NOTE: &str = "[Folded summary of earlier conversation]\n\
     That part of the conversation held no information worth retaining.";

/// Cap `text` at `cap` characters, appending `marker` when cut.
pub fn truncate_tool_output(text: &str, cap: usize, marker: &str) -> String {
    truncate_chars(text, cap, marker).0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    pub messages_folded: usize,
    pub size_before: usize,
    pub size_after: usize,
    pub low_information: bool,
    /// The transcript is still above the threshold after folding.
    pub still_over: bool,
}

pub struct Compactor {
    config: CompactionConfig,
    sizer: Arc<dyn SizeEstimator>,
}

impl Compactor {
    pub fn new(config: CompactionConfig, sizer: Arc<dyn SizeEstimator>) -> Self {
        Self { config, sizer }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn sizer(&self) -> &dyn SizeEstimator {
        self.sizer.as_ref()
    }

    pub fn needs_compaction(&self, messages: &[Message]) -> bool {
        self.config.enabled && self.sizer.size_of(messages) > self.config.threshold
    }

    /// Cap for a fresh tool result, tighter once the transcript is over
    /// the threshold.
    pub fn tool_result_cap(&self, over_threshold: bool) -> usize {
        if over_threshold {
            self.config.tool_result_min_chars
        } else {
            self.config.tool_result_max_chars
        }
    }

    pub fn truncate_result(&self, text: &str, over_threshold: bool) -> String {
        truncate_tool_output(
            text,
            self.tool_result_cap(over_threshold),
            &self.config.truncation_marker,
        )
    }

    /// The message range that may be folded, if any.
    ///
    /// Eligible blocks lie entirely inside the anchors and before any
    /// exchange still waiting on tool results. System blocks and the most
    /// recent user message are never folded; they split runs rather than
    /// bound them, so tool traffic produced after the latest user message
    /// stays foldable. Among the contiguous runs of eligible blocks the
    /// longest wins, the earliest on ties; a run of fewer than two
    /// messages is not worth a summarizer call.
    pub fn fold_span(&self, messages: &[Message]) -> Option<Range<usize>> {
        let len = messages.len();
        let lower = self.config.anchor_head;
        let mut upper = len.saturating_sub(self.config.anchor_tail);
        let last_user = messages.iter().rposition(|m| m.role == Role::User);

        let ranges = chunk_ranges(messages);
        if let Some(last) = ranges.last() {
            if is_pending(&messages[last.clone()]) {
                upper = upper.min(last.start);
            }
        }
        if upper <= lower {
            return None;
        }

        let mut best: Option<Range<usize>> = None;
        let mut current: Option<Range<usize>> = None;
        for r in ranges {
            let eligible = r.start >= lower
                && r.end <= upper
                && messages[r.start].role != Role::System
                && !last_user.is_some_and(|u| r.contains(&u))
                && !is_pending(&messages[r.clone()]);
            if eligible {
                current = Some(match current {
                    Some(c) => c.start..r.end,
                    None => r,
                });
            } else if let Some(c) = current.take() {
                best = longer(best, c);
            }
        }
        if let Some(c) = current {
            best = longer(best, c);
        }
        best.filter(|b| b.len() >= 2)
    }

    /// Replace the foldable middle of `messages` with one assistant
    /// message carrying a synopsis. Returns `None` when nothing can be
    /// folded. A summarizer error leaves `messages` untouched.
    pub async fn compact(
        &self,
        messages: &mut Vec<Message>,
        summarizer: &dyn Summarizer,
    ) -> Result<Option<CompactionReport>> {
        let size_before = self.sizer.size_of(messages);
        let Some(span) = self.fold_span(messages) else {
            tracing::debug!(size = size_before, "nothing eligible for compaction");
            return Ok(None);
        };

        let synopsis = summarizer.summarize(&messages[span.clone()], None).await?;
        let low_information = synopsis.is_empty_of_facts();
        let replacement = match synopsis {
            Synopsis::Text(text) => Message::assistant(format!("{FOLDED_SUMMARY_PREFIX}{text}")),
            Synopsis::NoKeyFacts => Message::assistant(LOW_INFORMATION_NOTE),
        };

        let messages_folded = span.len();
        messages.splice(span, std::iter::once(replacement));

        let size_after = self.sizer.size_of(messages);
        let report = CompactionReport {
            messages_folded,
            size_before,
            size_after,
            low_information,
            still_over: size_after > self.config.threshold,
        };
        TraceEvent::TranscriptCompacted {
            messages_folded,
            size_before,
            size_after,
            low_information,
        }
        .emit();
        Ok(Some(report))
    }
}

fn is_pending(block: &[Message]) -> bool {
    let Some(head) = block.first().filter(|m| m.has_tool_calls()) else {
        return false;
    };
    head.tool_calls.iter().any(|c| {
        !block[1..]
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some(c.call_id.as_str()))
    })
}

fn longer(best: Option<Range<usize>>, candidate: Range<usize>) -> Option<Range<usize>> {
    match best {
        Some(b) if b.len() >= candidate.len() => Some(b),
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::CharHeuristic;
    use async_trait::async_trait;
    use pv_domain::error::Error;
    use pv_domain::tool::ToolCall;
    use serde_json::json;

    struct Fixed(Option<Synopsis>);

    #[async_trait]
    impl Summarizer for Fixed {
        async fn summarize(&self, _: &[Message], _: Option<&str>) -> Result<Synopsis> {
            self.0
                .clone()
                .ok_or_else(|| Error::Summarizer("unavailable".into()))
        }
    }

    fn compactor(threshold: usize) -> Compactor {
        let config = CompactionConfig {
            threshold,
            ..CompactionConfig::default()
        };
        Compactor::new(config, Arc::new(CharHeuristic::default()))
    }

    fn call(id: &str) -> ToolCall {
        ToolCall {
            call_id: id.into(),
            tool_name: "lookup".into(),
            arguments: json!({}),
        }
    }

    fn long_transcript() -> Vec<Message> {
        let mut m = vec![Message::system("persona")];
        for i in 0..6 {
            m.push(Message::user(format!("question {i}")));
            m.push(Message::assistant(format!("answer {i}")));
        }
        m
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_tool_output("ééééé", 2, "…"), "éé…");
        assert_eq!(truncate_tool_output("short", 10, "…"), "short");
    }

    #[test]
    fn result_cap_tightens_over_threshold() {
        let c = compactor(100);
        assert_eq!(c.tool_result_cap(false), 8_000);
        assert_eq!(c.tool_result_cap(true), 300);
        let long = "x".repeat(500);
        let capped = c.truncate_result(&long, true);
        assert_eq!(capped.chars().count(), 300 + "…[truncated]".chars().count());
        assert_eq!(c.truncate_result(&long, false), long);
    }

    #[test]
    fn fold_span_respects_anchors() {
        let c = compactor(10);
        let m = long_transcript();
        // len 13, tail anchor -> 9.
        assert_eq!(c.fold_span(&m), Some(1..9));
    }

    #[test]
    fn tool_traffic_after_the_latest_user_message_is_foldable() {
        let c = compactor(10);
        let mut m = vec![Message::system("persona"), Message::user("research this")];
        for i in 0..6 {
            let id = format!("c{i}");
            m.push(Message::assistant_with_tool_calls("", vec![call(&id)]));
            m.push(Message::tool_result(&id, "lookup", format!("result {i}")));
        }
        // len 14, tail anchor -> 10; the user message at 1 is kept.
        assert_eq!(c.fold_span(&m), Some(2..10));
    }

    #[test]
    fn latest_user_message_splits_runs() {
        let c = compactor(10);
        let m = vec![
            Message::system("s"),
            Message::assistant("a"),
            Message::assistant("b"),
            Message::user("latest"),
            Message::assistant("c"),
            Message::assistant("d"),
            Message::assistant("e"),
            Message::assistant("t1"),
            Message::assistant("t2"),
            Message::assistant("t3"),
            Message::assistant("t4"),
        ];
        // Runs 1..3 and 4..7; the longer one wins.
        assert_eq!(c.fold_span(&m), Some(4..7));
    }

    #[test]
    fn fold_span_stops_before_pending_exchange() {
        let c = compactor(10);
        let mut m = long_transcript();
        m.push(Message::assistant_with_tool_calls("", vec![call("a"), call("b")]));
        m.push(Message::tool_result("a", "lookup", "one"));
        m.push(Message::assistant("x"));
        m.push(Message::assistant("y"));
        m.push(Message::assistant("z"));
        m.push(Message::assistant_with_tool_calls("", vec![call("c")]));
        // The unanswered exchange at 13..15 is never folded, which leaves
        // 1..11 before the latest user message as the longest run.
        assert_eq!(c.fold_span(&m), Some(1..11));

        let mut tail_pending = vec![Message::system("s")];
        tail_pending.extend((0..6).map(|i| Message::assistant(format!("a{i}"))));
        tail_pending.push(Message::assistant_with_tool_calls("", vec![call("p")]));
        let c0 = Compactor::new(
            CompactionConfig {
                anchor_tail: 0,
                ..CompactionConfig::default()
            },
            Arc::new(CharHeuristic::default()),
        );
        assert_eq!(c0.fold_span(&tail_pending), Some(1..7));
    }

    #[test]
    fn fold_span_never_splits_a_tool_exchange() {
        let c = compactor(10);
        let m = vec![
            Message::system("s"),
            Message::assistant_with_tool_calls("", vec![call("a")]),
            Message::tool_result("a", "lookup", "r"),
            Message::assistant("one"),
            Message::assistant("two"),
            Message::user("latest"),
            Message::assistant("t1"),
            Message::assistant("t2"),
            Message::assistant("t3"),
            Message::assistant("t4"),
        ];
        let span = c.fold_span(&m).unwrap();
        assert_eq!(span, 1..5);

        // A head anchor landing inside the exchange pushes the span past it.
        let c2 = Compactor::new(
            CompactionConfig {
                anchor_head: 2,
                ..CompactionConfig::default()
            },
            Arc::new(CharHeuristic::default()),
        );
        assert_eq!(c2.fold_span(&m), Some(3..5));
    }

    #[test]
    fn system_blocks_split_runs() {
        let c = compactor(10);
        let m = vec![
            Message::system("s"),
            Message::assistant("a"),
            Message::system("mid"),
            Message::assistant("b"),
            Message::assistant("c"),
            Message::user("latest"),
            Message::assistant("t1"),
            Message::assistant("t2"),
            Message::assistant("t3"),
            Message::assistant("t4"),
        ];
        assert_eq!(c.fold_span(&m), Some(3..5));
    }

    #[test]
    fn short_transcripts_are_left_alone() {
        let c = compactor(10);
        let m = vec![Message::system("s"), Message::user("hi"), Message::assistant("hello")];
        assert_eq!(c.fold_span(&m), None);
    }

    #[tokio::test]
    async fn compact_replaces_span_with_prefixed_synopsis() {
        let c = compactor(10);
        let mut m = long_transcript();
        let tail: Vec<Message> = m[9..].to_vec();
        let report = c
            .compact(&mut m, &Fixed(Some(Synopsis::Text("they talked".into()))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.messages_folded, 8);
        assert!(report.size_after < report.size_before);
        assert!(!report.low_information);
        assert_eq!(m.len(), 13 - 8 + 1);
        assert_eq!(m[0], Message::system("persona"));
        assert_eq!(m[1].role, Role::Assistant);
        assert!(m[1].content.starts_with(FOLDED_SUMMARY_PREFIX));
        assert!(m[1].content.ends_with("they talked"));
        assert_eq!(m[2..], tail[..]);
    }

    #[tokio::test]
    async fn no_key_facts_becomes_plain_note() {
        let c = compactor(10);
        let mut m = long_transcript();
        let report = c
            .compact(&mut m, &Fixed(Some(Synopsis::NoKeyFacts)))
            .await
            .unwrap()
            .unwrap();
        assert!(report.low_information);
        assert_eq!(m[1].content, LOW_INFORMATION_NOTE);
    }

    #[tokio::test]
    async fn summarizer_failure_leaves_transcript_untouched() {
        let c = compactor(10);
        let mut m = long_transcript();
        let before = m.clone();
        assert!(c.compact(&mut m, &Fixed(None)).await.is_err());
        assert_eq!(m, before);
    }
}
