//! Blocks: the atomic units a transcript is windowed and folded by.
//!
//! A block is either one system / user / plain assistant message, or an
//! assistant message carrying tool calls followed by the tool results
//! answering it. A block is kept or dropped whole.

use std::collections::HashSet;
use std::ops::Range;

use pv_domain::tool::{Message, Role};
use pv_domain::trace::TraceEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    messages: Vec<Message>,
}

impl Block {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_system(&self) -> bool {
        self.messages.first().is_some_and(|m| m.role == Role::System)
    }

    /// An assistant tool-call message plus its results.
    pub fn is_tool_exchange(&self) -> bool {
        self.messages.first().is_some_and(Message::has_tool_calls)
    }

    /// Call ids requested in this block that have no result yet.
    pub fn pending_call_ids(&self) -> Vec<&str> {
        let Some(head) = self.messages.first().filter(|m| m.has_tool_calls()) else {
            return Vec::new();
        };
        let answered: HashSet<&str> = self.messages[1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        head.tool_calls
            .iter()
            .map(|c| c.call_id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }
}

/// Index ranges of the blocks of `messages`, in order. The ranges are
/// contiguous and cover every message exactly once.
pub fn chunk_ranges(messages: &[Message]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    // Start of the open tool-exchange block, if any.
    let mut open: Option<usize> = None;

    for (i, msg) in messages.iter().enumerate() {
        if msg.role == Role::Tool && open.is_some() {
            continue;
        }
        if let Some(start) = open.take() {
            ranges.push(start..i);
        }
        if msg.has_tool_calls() {
            open = Some(i);
        } else {
            ranges.push(i..i + 1);
        }
    }
    if let Some(start) = open {
        ranges.push(start..messages.len());
    }
    ranges
}

/// Partition `messages` into blocks. Malformed shapes (orphaned tool
/// results) never fail; an orphan becomes a block of its own.
pub fn chunk_into_blocks(messages: &[Message]) -> Vec<Block> {
    chunk_ranges(messages)
        .into_iter()
        .map(|r| Block {
            messages: messages[r].to_vec(),
        })
        .collect()
}

pub fn flatten(blocks: Vec<Block>) -> Vec<Message> {
    blocks.into_iter().flat_map(Block::into_messages).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shape validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingIssue {
    pub index: usize,
    pub problem: String,
}

/// Report tool results that answer no open call, and tool exchanges
/// whose calls were never answered before the conversation moved on.
/// Each issue is emitted as a `MalformedTranscript` warning; nothing is
/// rejected.
pub fn validate_tool_pairing(messages: &[Message]) -> Vec<PairingIssue> {
    let mut issues = Vec::new();
    let ranges = chunk_ranges(messages);
    let last = ranges.len().saturating_sub(1);

    for (n, range) in ranges.iter().enumerate() {
        let head = &messages[range.start];
        if head.role == Role::Tool {
            issues.push(PairingIssue {
                index: range.start,
                problem: "tool result without a preceding tool call".into(),
            });
            continue;
        }
        if !head.has_tool_calls() {
            continue;
        }
        let requested: HashSet<&str> = head.tool_calls.iter().map(|c| c.call_id.as_str()).collect();
        let mut answered = HashSet::new();
        for i in range.start + 1..range.end {
            match messages[i].tool_call_id.as_deref() {
                Some(id) if requested.contains(id) => {
                    answered.insert(id);
                }
                other => issues.push(PairingIssue {
                    index: i,
                    problem: format!("tool result answers unknown call id {:?}", other.unwrap_or("")),
                }),
            }
        }
        // The newest exchange may legitimately still be awaiting results.
        if n != last {
            for call in &head.tool_calls {
                if !answered.contains(call.call_id.as_str()) {
                    issues.push(PairingIssue {
                        index: range.start,
                        problem: format!("tool call {} has no result", call.call_id),
                    });
                }
            }
        }
    }

    for issue in &issues {
        TraceEvent::MalformedTranscript {
            index: issue.index,
            problem: issue.problem.clone(),
        }
        .emit();
    }
    issues
}
