//! Synopsis generation for compaction, rolling epochs and archival.

use std::sync::Arc;

use async_trait::async_trait;
use pv_domain::error::{Error, Result};
use pv_domain::text::char_cut;
use pv_domain::tool::{Message, Role};
use pv_providers::{ChatRequest, LlmProvider};

/// Reply the model gives when a span holds nothing worth keeping.
pub const NO_KEY_FACTS: &str = "[NO_KEY_FACTS]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synopsis {
    Text(String),
    NoKeyFacts,
}

impl Synopsis {
    pub fn is_empty_of_facts(&self) -> bool {
        matches!(self, Synopsis::NoKeyFacts)
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `messages` into a synopsis. `prior_context` carries
    /// earlier synopses the new one may build on.
    async fn summarize(&self, messages: &[Message], prior_context: Option<&str>) -> Result<Synopsis>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider-backed summarizer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct LlmSummarizer {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            temperature: 0.1,
            max_tokens: Some(2000),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, messages: &[Message], prior_context: Option<&str>) -> Result<Synopsis> {
        let conversational = conversational_messages(messages);
        if conversational.is_empty() {
            return Ok(Synopsis::NoKeyFacts);
        }

        let prompt = build_prompt(&conversational, prior_context);
        let req = ChatRequest {
            messages: vec![Message::user(prompt)],
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            ..Default::default()
        };

        let resp = self
            .provider
            .chat(req)
            .await
            .map_err(|e| Error::Summarizer(e.to_string()))?;

        parse_reply(&resp.content)
    }
}

/// Drop tool traffic and empty messages; what remains is what people said.
fn conversational_messages(messages: &[Message]) -> Vec<&Message> {
    messages
        .iter()
        .filter(|m| m.role != Role::Tool && !m.has_tool_calls() && !m.content.trim().is_empty())
        .collect()
}

fn parse_reply(content: &str) -> Result<Synopsis> {
    let text = content.trim();
    if text.is_empty() {
        return Err(Error::Summarizer("model returned an empty synopsis".into()));
    }
    if text.contains(NO_KEY_FACTS) {
        return Ok(Synopsis::NoKeyFacts);
    }
    Ok(Synopsis::Text(text.to_string()))
}

fn build_prompt(messages: &[&Message], prior_context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a meticulous conversation summarizer. Condense the conversation \
         below into a short synopsis that preserves:\n\
         1. Facts learned about the people and topics involved\n\
         2. Decisions made and conclusions reached\n\
         3. Open questions and unfinished work\n\n\
         Write from a neutral third-person viewpoint in at most 400 words. \
         Omit greetings and pleasantries.\n",
    );
    prompt.push_str(&format!(
        "If the conversation is only small talk or system chatter with nothing \
         worth looking up later, reply with exactly {NO_KEY_FACTS} and nothing else.\n"
    ));
    if let Some(prior) = prior_context.filter(|p| !p.trim().is_empty()) {
        prompt.push_str("\nEARLIER SUMMARIES (for reference, do not repeat them):\n");
        prompt.push_str(prior);
        prompt.push('\n');
    }
    prompt.push_str("\nCONVERSATION:\n");
    prompt.push_str(&build_conversation_text(messages));
    prompt
}

fn build_conversation_text(messages: &[&Message]) -> String {
    let mut buf = String::new();
    for msg in messages {
        let role_label = match msg.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Tool => "Tool",
            Role::System => "System",
        };
        buf.push_str(role_label);
        buf.push_str(": ");
        // Long messages keep their head and tail.
        let total = msg.content.chars().count();
        if total > 2000 {
            let head_end = char_cut(&msg.content, 1000).unwrap_or(msg.content.len());
            let tail_start = char_cut(&msg.content, total - 500).unwrap_or(msg.content.len());
            buf.push_str(&msg.content[..head_end]);
            buf.push_str(" [...] ");
            buf.push_str(&msg.content[tail_start..]);
        } else {
            buf.push_str(&msg.content);
        }
        buf.push('\n');
    }
    buf
}
