use pv_domain::error::Result;
use pv_domain::tool::ToolDefinition;
use serde_json::{Map, Value};

/// A named, schema-described action the model may request.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON-Schema parameters advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. `args` holds only the declared parameters; ambient
    /// values such as the session id arrive through `ctx`.
    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Values supplied by the runtime alongside the model's arguments.
/// Never part of the advertised parameter schema.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: Option<String>,
    pub extras: Map<String, Value>,
}

impl ToolContext {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            extras: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    /// Strings pass through, structured results are JSON-encoded.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(s) => s.clone(),
            ToolOutput::Json(Value::String(s)) => s.clone(),
            ToolOutput::Json(v) => v.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        ToolOutput::Text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        ToolOutput::Text(s.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(v: Value) -> Self {
        ToolOutput::Json(v)
    }
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, tool: &str, field: &str) -> Result<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            pv_domain::error::Error::tool(tool, format!("missing required argument '{field}'"))
        })
}
