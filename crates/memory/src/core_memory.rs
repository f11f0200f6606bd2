//! `CoreMemoryBuilder` assembles the core-memory system message from the
//! base persona, the configured core facts, and related semantic memories.
//!
//! Gracefully degrades: a failing store or semantic service only removes
//! its section, the build itself never fails.

use pv_domain::config::MemoryConfig;
use pv_domain::text::truncate_chars;
use pv_domain::tool::Message;
use tracing::warn;

use crate::semantic::SemanticMemory;
use crate::store::MemoryStore;

const TRUNCATED_MARKER: &str = "\n[CORE_MEMORY_TRUNCATED]";

pub struct CoreMemoryBuilder<'a> {
    store: &'a dyn MemoryStore,
    semantic: Option<&'a dyn SemanticMemory>,
    config: &'a MemoryConfig,
    system_prompt: String,
}

impl<'a> CoreMemoryBuilder<'a> {
    pub fn new(store: &'a dyn MemoryStore, config: &'a MemoryConfig) -> Self {
        Self {
            store,
            semantic: None,
            config,
            system_prompt: String::new(),
        }
    }

    pub fn with_semantic(mut self, semantic: Option<&'a dyn SemanticMemory>) -> Self {
        self.semantic = semantic;
        self
    }

    /// Base persona placed before every memory section.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Assemble the text, capped at `core_max_chars`. Empty when there is
    /// neither a persona nor any memory.
    pub async fn build(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        let prompt = self.system_prompt.trim();
        if !prompt.is_empty() {
            sections.push(prompt.to_string());
        }

        // ── 1. Core facts ───────────────────────────────────────────
        let mut facts = Vec::new();
        for key in &self.config.core_keys {
            match self.store.get(&self.config.core_category, key).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    facts.push(format!("### {key}\n{}", text.trim()));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(category = %self.config.core_category, key = %key, error = %e, "failed to read core fact");
                }
            }
        }
        if !facts.is_empty() {
            sections.push(format!("## Core memory\n{}", facts.join("\n\n")));
        }

        // ── 2. Semantic facts and relations ─────────────────────────
        if let Some(semantic) = self.semantic {
            let sem = &self.config.semantic;
            match semantic
                .search_related(&sem.core_query, &sem.user_id, sem.search_limit)
                .await
            {
                Ok(related) => {
                    let facts = related.fact_lines();
                    if !facts.is_empty() {
                        sections.push(format!("## Retrieved facts\n{}", bullets(&facts)));
                    }
                    let relations = related.relation_lines();
                    if !relations.is_empty() {
                        sections.push(format!("## Related entities\n{}", bullets(&relations)));
                    }
                }
                Err(e) => {
                    warn!(user_id = %sem.user_id, error = %e, "semantic memory lookup failed for core memory");
                }
            }
        }

        let assembled = sections.join("\n\n");
        let (capped, truncated) =
            truncate_chars(&assembled, self.config.core_max_chars, TRUNCATED_MARKER);
        tracing::debug!(chars = capped.len(), sections = sections.len(), truncated, "core memory built");
        capped
    }

    /// [`build`](Self::build) wrapped as a system message, `None` when empty.
    pub async fn build_message(&self) -> Option<Message> {
        let text = self.build().await;
        if text.is_empty() {
            None
        } else {
            Some(Message::system(text))
        }
    }
}

fn bullets(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}
