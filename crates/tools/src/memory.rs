//! Built-in memory tools: `memory.save_fact` and `memory.recall`.

use std::sync::Arc;

use pv_domain::background::spawn_detached;
use pv_domain::error::Result;
use pv_domain::tool::{Message, ToolDefinition};
use pv_memory::{MemoryStore, SemanticMemory};
use serde_json::{json, Value};

use crate::tool::{required_str, Tool, ToolContext, ToolOutput};

const SAVE_FACT: &str = "memory.save_fact";
const RECALL: &str = "memory.recall";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// memory.save_fact
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Persist a durable fact. Facts outside the core category are also
/// handed to semantic memory in the background when it is configured.
pub struct SaveFactTool {
    store: Arc<dyn MemoryStore>,
    semantic: Option<Arc<dyn SemanticMemory>>,
    default_category: String,
    user_id: String,
}

impl SaveFactTool {
    pub fn new(store: Arc<dyn MemoryStore>, default_category: impl Into<String>) -> Self {
        Self {
            store,
            semantic: None,
            default_category: default_category.into(),
            user_id: "default_user".into(),
        }
    }

    pub fn with_semantic(
        mut self,
        semantic: Option<Arc<dyn SemanticMemory>>,
        user_id: impl Into<String>,
    ) -> Self {
        self.semantic = semantic;
        self.user_id = user_id.into();
        self
    }
}

#[async_trait::async_trait]
impl Tool for SaveFactTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SAVE_FACT.into(),
            description: "Store a long-lived fact about the user or the assistant. \
                Write it as a neutral third-person statement using names, never \
                pronouns. Continue the conversation naturally afterwards."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "Identifier of the fact, e.g. user_profile"
                    },
                    "content": {
                        "type": "string",
                        "description": "The fact itself"
                    },
                    "category": {
                        "type": "string",
                        "description": format!("Storage partition (default: {})", self.default_category)
                    },
                    "append": {
                        "type": "boolean",
                        "description": "Add to the existing fact instead of replacing it (default: true)"
                    }
                },
                "required": ["key", "content"]
            }),
        }
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let key = required_str(&args, SAVE_FACT, "key")?;
        let content = required_str(&args, SAVE_FACT, "content")?;
        let category = args
            .get("category")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(self.default_category.as_str());
        let append = args.get("append").and_then(Value::as_bool).unwrap_or(true);

        self.store.save(category, key, content, append).await?;
        tracing::info!(
            session_id = ctx.session_id.as_deref().unwrap_or("-"),
            category,
            key,
            "fact saved to durable memory"
        );

        if let Some(semantic) = self.semantic.clone() {
            let message = Message::assistant(content);
            let user_id = self.user_id.clone();
            spawn_detached("semantic_fact_store", async move {
                semantic.store_messages(&[message], &user_id).await
            });
        }

        Ok(ToolOutput::Text(format!(
            "Saved to {category}/{key}. Continue the conversation without announcing it."
        )))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// memory.recall
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Search the durable store and, when configured, semantic memory.
pub struct RecallTool {
    store: Arc<dyn MemoryStore>,
    semantic: Option<Arc<dyn SemanticMemory>>,
    user_id: String,
    limit: u32,
}

impl RecallTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            semantic: None,
            user_id: "default_user".into(),
            limit: 5,
        }
    }

    pub fn with_semantic(
        mut self,
        semantic: Option<Arc<dyn SemanticMemory>>,
        user_id: impl Into<String>,
        limit: u32,
    ) -> Self {
        self.semantic = semantic;
        self.user_id = user_id.into();
        self.limit = limit;
        self
    }
}

#[async_trait::async_trait]
impl Tool for RecallTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: RECALL.into(),
            description: "Search long-term memory for facts, preferences and past \
                conversations. Phrase the query in the third person."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for"
                    },
                    "category": {
                        "type": "string",
                        "description": "Restrict the search to one partition"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let query = required_str(&args, RECALL, "query")?;
        let category = args.get("category").and_then(Value::as_str);
        tracing::info!(
            session_id = ctx.session_id.as_deref().unwrap_or("-"),
            query,
            "recalling from durable memory"
        );

        let mut sections = Vec::new();

        let local = self.store.search(query, category).await?;
        if !local.is_empty() {
            sections.push(format!("Stored notes:\n{}", local.join("\n\n")));
        }

        if let Some(ref semantic) = self.semantic {
            match semantic.search_related(query, &self.user_id, self.limit).await {
                Ok(related) if !related.is_empty() => sections.push(related.render()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "semantic recall failed, using local results only");
                }
            }
        }

        if sections.is_empty() {
            return Ok(ToolOutput::Text(
                "No stored memory matches this query. Stop searching for it.".into(),
            ));
        }
        Ok(ToolOutput::Text(sections.join("\n\n")))
    }
}
