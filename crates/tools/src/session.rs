//! `session.recall`: keyword search over the current session's transcript.
//!
//! The session is resolved from the ambient [`ToolContext`], never from a
//! model-visible argument.

use std::sync::Arc;

use pv_domain::error::{Error, Result};
use pv_domain::text::truncate_chars;
use pv_domain::tool::{Message, Role, ToolDefinition};
use pv_sessions::SessionStorage;
use serde_json::{json, Value};

use crate::tool::{Tool, ToolContext, ToolOutput};

const SESSION_RECALL: &str = "session.recall";
const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;
const PREVIEW_CHARS: usize = 300;

pub struct SessionRecallTool {
    storage: Arc<dyn SessionStorage>,
}

impl SessionRecallTool {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait::async_trait]
impl Tool for SessionRecallTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SESSION_RECALL.into(),
            description: "Search the history of the current conversation. Use this \
                first when looking back for details mentioned earlier; fall back to \
                memory.recall when it finds nothing."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Topics to look for, e.g. [\"budget\", \"deployment\"]"
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!("Matches per keyword, newest first (default: {DEFAULT_LIMIT})")
                    }
                },
                "required": ["keywords"]
            }),
        }
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let session_id = ctx
            .session_id
            .as_deref()
            .ok_or_else(|| Error::tool(SESSION_RECALL, "no session is bound to this call"))?;
        let keywords = keywords(&args)?;
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).clamp(1, MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);

        let Some(record) = self.storage.load(session_id).await? else {
            return Ok(ToolOutput::Text(
                "This conversation has no earlier messages.".into(),
            ));
        };
        tracing::info!(
            session_id,
            keywords = keywords.len(),
            messages = record.messages.len(),
            "searching session history"
        );

        let mut sections = Vec::new();
        for keyword in &keywords {
            let hits = search(&record.messages, keyword, limit);
            if hits.is_empty() {
                continue;
            }
            let lines: Vec<String> = hits
                .into_iter()
                .map(|(index, m)| format!("[#{index} {}] {}", m.role.as_str(), preview(m)))
                .collect();
            sections.push(format!("### {keyword}\n{}", lines.join("\n")));
        }

        if sections.is_empty() {
            return Ok(ToolOutput::Text(
                "Nothing in this conversation mentions that. It may have come up in an \
                 earlier conversation; search there with memory.recall."
                    .into(),
            ));
        }
        Ok(ToolOutput::Text(sections.join("\n\n")))
    }
}

fn keywords(args: &Value) -> Result<Vec<String>> {
    let out: Vec<String> = match args.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    };
    if out.is_empty() {
        return Err(Error::tool(SESSION_RECALL, "missing required argument 'keywords'"));
    }
    Ok(out)
}

/// Messages containing every term of `keyword`, newest first. Tool-call
/// requests without text are skipped.
fn search<'a>(messages: &'a [Message], keyword: &str, limit: usize) -> Vec<(usize, &'a Message)> {
    let terms: Vec<String> = keyword.split_whitespace().map(str::to_lowercase).collect();
    messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.role != Role::System && !m.content.is_empty())
        .filter(|(_, m)| {
            let haystack = m.content.to_lowercase();
            terms.iter().all(|t| haystack.contains(t.as_str()))
        })
        .take(limit)
        .collect()
}

fn preview(m: &Message) -> String {
    let flat = m.content.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&flat, PREVIEW_CHARS, "…").0
}
