//! Budget-bounded context window selection.
//!
//! System blocks are always kept. The remaining blocks are taken newest
//! first until the next one would overflow the budget; everything older
//! than that is dropped, so recency wins over completeness.

use pv_domain::tool::Message;
use pv_domain::trace::TraceEvent;
use serde::Serialize;

use crate::blocks::{flatten, Block};
use crate::sizing::SizeEstimator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub blocks_total: usize,
    pub blocks_kept: usize,
    pub blocks_dropped: usize,
    /// Summed block sizes of the window.
    pub size: usize,
    pub budget: usize,
}

impl WindowReport {
    /// System content alone can push a window past its budget.
    pub fn over_budget(&self) -> bool {
        self.size > self.budget
    }

    pub fn emit(&self) {
        TraceEvent::WindowBuilt {
            blocks_total: self.blocks_total,
            blocks_kept: self.blocks_kept,
            size: self.size,
            budget: self.budget,
        }
        .emit();
        if self.blocks_dropped > 0 {
            TraceEvent::WindowTruncated {
                blocks_dropped: self.blocks_dropped,
                budget: self.budget,
            }
            .emit();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub blocks: Vec<Block>,
    pub report: WindowReport,
}

impl ContextWindow {
    pub fn into_messages(self) -> Vec<Message> {
        flatten(self.blocks)
    }
}

pub fn build_window(blocks: Vec<Block>, budget: usize, sizer: &dyn SizeEstimator) -> ContextWindow {
    let blocks_total = blocks.len();
    let (system, other): (Vec<Block>, Vec<Block>) = blocks.into_iter().partition(Block::is_system);

    let mut size: usize = system.iter().map(|b| sizer.size_of(b.messages())).sum();

    let mut kept_rev: Vec<Block> = Vec::new();
    for block in other.into_iter().rev() {
        let block_size = sizer.size_of(block.messages());
        if size + block_size > budget {
            break;
        }
        size += block_size;
        kept_rev.push(block);
    }
    let blocks_dropped = blocks_total - system.len() - kept_rev.len();

    let mut window = system;
    window.extend(kept_rev.into_iter().rev());

    let report = WindowReport {
        blocks_total,
        blocks_kept: window.len(),
        blocks_dropped,
        size,
        budget,
    };
    if blocks_dropped > 0 {
        tracing::warn!(blocks_dropped, budget, "context window dropped oldest history");
    }
    ContextWindow {
        blocks: window,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::chunk_into_blocks;
    use crate::sizing::CharHeuristic;
    use pv_domain::tool::{Role, ToolCall};
    use serde_json::json;

    fn heuristic() -> CharHeuristic {
        CharHeuristic {
            per_message_overhead: 0,
            chars_per_unit: 1,
        }
    }

    fn transcript() -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("aaaaaaaaaa"),
            Message::assistant("bbbbbbbbbb"),
            Message::user("cccccccccc"),
        ]
    }

    #[test]
    fn everything_fits_under_a_large_budget() {
        let w = build_window(chunk_into_blocks(&transcript()), 1_000, &heuristic());
        assert_eq!(w.report.blocks_dropped, 0);
        assert_eq!(w.report.size, 33);
        assert_eq!(w.into_messages(), transcript());
    }

    #[test]
    fn oldest_non_system_blocks_are_dropped_first() {
        let w = build_window(chunk_into_blocks(&transcript()), 25, &heuristic());
        assert_eq!(w.report.blocks_dropped, 2);
        let msgs = w.into_messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[1].content, "cccccccccc");
    }

    #[test]
    fn stops_at_first_overflow_even_if_older_blocks_would_fit() {
        let messages = vec![
            Message::user("x"),
            Message::user("yyyyyyyyyy"),
            Message::user("zz"),
        ];
        let w = build_window(chunk_into_blocks(&messages), 5, &heuristic());
        let msgs = w.into_messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].content, "zz");
    }

    #[test]
    fn system_blocks_survive_even_over_budget() {
        let messages = vec![Message::system("a very long system prompt"), Message::user("hi")];
        let w = build_window(chunk_into_blocks(&messages), 5, &heuristic());
        assert!(w.report.over_budget());
        assert_eq!(w.report.blocks_kept, 1);
        assert_eq!(w.blocks[0].messages()[0].role, Role::System);
    }

    #[test]
    fn system_blocks_move_to_the_front() {
        let messages = vec![
            Message::user("first"),
            Message::system("mid"),
            Message::user("last"),
        ];
        let w = build_window(chunk_into_blocks(&messages), 1_000, &heuristic());
        let roles: Vec<Role> = w.into_messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
    }

    #[test]
    fn tool_exchange_is_kept_or_dropped_whole() {
        let call = ToolCall {
            call_id: "c".into(),
            tool_name: "t".into(),
            arguments: json!({}),
        };
        let messages = vec![
            Message::user("q"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_result("c", "t", "r".repeat(50)),
            Message::assistant("done"),
        ];
        let h = heuristic();
        let exchange = h.size_of(&messages[1..3]);

        let tight = build_window(chunk_into_blocks(&messages), exchange, &h);
        assert_eq!(tight.into_messages(), vec![Message::assistant("done")]);

        let roomy = build_window(chunk_into_blocks(&messages), exchange + 4, &h);
        let msgs = roomy.into_messages();
        assert_eq!(msgs.len(), 3);
        assert!(msgs[0].has_tool_calls());
    }

    #[test]
    fn window_size_never_exceeds_budget_without_system_overflow() {
        let messages: Vec<Message> = (0..40)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user("u".repeat(i % 7 + 1))
                } else {
                    Message::assistant("a".repeat(i % 5 + 3))
                }
            })
            .collect();
        let h = heuristic();
        for budget in [0, 1, 5, 17, 40, 99, 1_000] {
            let w = build_window(chunk_into_blocks(&messages), budget, &h);
            let size = h.size_of(&w.clone().into_messages());
            assert!(size <= budget, "budget {budget} size {size}");
            assert_eq!(size, w.report.size);
            // Kept history is a suffix of the original.
            let kept = w.into_messages();
            assert_eq!(kept[..], messages[messages.len() - kept.len()..]);
        }
    }
}
