//! Tool registry.
//!
//! Built explicitly per runtime. Dispatch never fails: unknown tools and
//! invocation errors are rendered as result text so the model can adapt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use pv_domain::tool::{ToolCall, ToolDefinition};
use pv_domain::trace::TraceEvent;
use tracing::Instrument;

use crate::tool::{Tool, ToolContext};

/// Rendered outcome of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDispatch {
    pub content: String,
    pub is_error: bool,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under its declared name, replacing any tool with
    /// the same name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.write().insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replaced existing tool registration");
        } else {
            tracing::debug!(tool = %name, "registered tool");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Definitions of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.read().values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Resolve and invoke `call`, rendering the result or failure as text.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolDispatch {
        let span = tracing::info_span!(
            "tool.call",
            tool_name = %call.tool_name,
            call_id = %call.call_id,
        );
        async {
            let start = Instant::now();
            let outcome = match self.resolve(&call.tool_name) {
                None => ToolDispatch {
                    content: format!("Error: unknown tool '{}'", call.tool_name),
                    is_error: true,
                },
                Some(tool) => match tool.invoke(call.arguments.clone(), ctx).await {
                    Ok(output) => ToolDispatch {
                        content: output.render(),
                        is_error: false,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "tool invocation failed");
                        ToolDispatch {
                            content: format!("Error: {e}"),
                            is_error: true,
                        }
                    }
                },
            };

            TraceEvent::ToolDispatched {
                tool_name: call.tool_name.clone(),
                call_id: call.call_id.clone(),
                is_error: outcome.is_error,
                result_chars: outcome.content.chars().count(),
                duration_ms: start.elapsed().as_millis() as u64,
            }
            .emit();

            outcome
        }
        .instrument(span)
        .await
    }
}
