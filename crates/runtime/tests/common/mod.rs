#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pv_domain::capability::ModelCapabilities;
use pv_domain::error::{Error, Result};
use pv_domain::tool::{Message, ToolCall, ToolDefinition};
use pv_providers::{ChatRequest, ChatResponse, LlmProvider};
use pv_runtime::{Summarizer, Synopsis};
use pv_tools::{Tool, ToolContext, ToolOutput, ToolRegistry};
use serde_json::{json, Value};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replays a fixed script of responses and records every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    fallback: Option<ChatResponse>,
    caps: ModelCapabilities,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ChatResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            caps: ModelCapabilities::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `resp`.
    pub fn repeating(resp: ChatResponse) -> Self {
        Self {
            fallback: Some(resp),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_capabilities(mut self, caps: ModelCapabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req);
        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        self.fallback.clone().ok_or_else(|| Error::Provider {
            provider: "scripted".into(),
            message: "script exhausted".into(),
        })
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.caps
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

pub fn call(id: &str, tool: &str, args: Value) -> ToolCall {
    ToolCall {
        call_id: id.into(),
        tool_name: tool.into(),
        arguments: args,
    }
}

/// A response asking for a single `echo` call.
pub fn ask_echo(id: &str, text: &str) -> ChatResponse {
    ChatResponse::tool_calls(vec![call(id, "echo", json!({ "text": text }))])
}

pub fn provider_down() -> Error {
    Error::Provider {
        provider: "scripted".into(),
        message: "connection refused".into(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summarizer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returns numbered synopses and records the spans it was given.
#[derive(Default)]
pub struct RecordingSummarizer {
    spans: Mutex<Vec<Vec<Message>>>,
}

impl RecordingSummarizer {
    pub fn spans(&self) -> Vec<Vec<Message>> {
        self.spans.lock().clone()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, messages: &[Message], _prior: Option<&str>) -> Result<Synopsis> {
        let mut spans = self.spans.lock();
        spans.push(messages.to_vec());
        Ok(Synopsis::Text(format!("synopsis #{}", spans.len())))
    }
}

/// Always fails.
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _messages: &[Message], _prior: Option<&str>) -> Result<Synopsis> {
        Err(Error::Summarizer("summarizer offline".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returns its `text` argument after an optional `delay_ms`.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".into(),
            description: "Repeat the given text.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "delay_ms": { "type": "integer" }
                },
                "required": ["text"]
            }),
        }
    }

    async fn invoke(&self, args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        if let Some(ms) = args.get("delay_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(ToolOutput::Text(text.to_string()))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "explode".into(),
            description: "Always fails.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn invoke(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        Err(Error::tool("explode", "kaboom"))
    }
}

/// Returns the session id it was invoked for.
pub struct WhoAmITool;

#[async_trait]
impl Tool for WhoAmITool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "whoami".into(),
            description: "Report the current session.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn invoke(&self, _args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::Text(ctx.session_id.clone().unwrap_or_else(|| "-".into())))
    }
}

pub fn test_tools() -> Arc<ToolRegistry> {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(EchoTool));
    tools.register(Arc::new(FailingTool));
    tools.register(Arc::new(WhoAmITool));
    tools
}
