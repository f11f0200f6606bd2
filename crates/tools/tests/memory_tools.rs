use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pv_domain::error::{Error, Result};
use pv_domain::tool::{Message, ToolCall};
use pv_memory::{MarkdownMemoryStore, MemoryStore, RelatedMemories, SemanticMemory};
use pv_sessions::{InMemorySessionStore, SessionRecord, SessionStorage};
use pv_tools::{RecallTool, SaveFactTool, SessionRecallTool, ToolContext, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;

fn registry(store: Arc<dyn MemoryStore>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(SaveFactTool::new(store.clone(), "core")));
    registry.register(Arc::new(RecallTool::new(store)));
    registry
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        call_id: "c1".into(),
        tool_name: name.into(),
        arguments: args,
    }
}

#[tokio::test]
async fn save_then_recall_round_trips_through_the_store() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(dir.path(), "core").unwrap());
    let registry = registry(store.clone());
    let ctx = ToolContext::for_session("s1");

    let saved = registry
        .dispatch(
            &call("memory.save_fact", json!({"key": "user_profile", "content": "Ada prefers green tea"})),
            &ctx,
        )
        .await;
    assert!(!saved.is_error, "{}", saved.content);
    assert_eq!(
        store.get("core", "user_profile").await.unwrap().as_deref(),
        Some("Ada prefers green tea")
    );

    let recalled = registry
        .dispatch(&call("memory.recall", json!({"query": "green tea"})), &ctx)
        .await;
    assert!(!recalled.is_error);
    assert!(recalled.content.contains("Ada prefers green tea"));
}

#[tokio::test]
async fn recall_with_no_match_says_so_plainly() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(dir.path(), "core").unwrap());
    let out = registry(store)
        .dispatch(&call("memory.recall", json!({"query": "volcano"})), &ToolContext::default())
        .await;
    assert!(!out.is_error);
    assert!(out.content.starts_with("No stored memory matches"));
}

#[tokio::test]
async fn missing_argument_is_reported_to_the_model() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(dir.path(), "core").unwrap());
    let out = registry(store)
        .dispatch(&call("memory.save_fact", json!({"key": "x"})), &ToolContext::default())
        .await;
    assert!(out.is_error);
    assert!(out.content.contains("content"));
}

#[test]
fn session_id_is_not_an_advertised_parameter() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(dir.path(), "core").unwrap());
    for def in registry(store).definitions() {
        let props = def.parameters["properties"].as_object().unwrap();
        assert!(!props.contains_key("session_id"), "{}", def.name);
        assert!(!props.contains_key("__sessionId"), "{}", def.name);
    }
}

// ── Semantic write-behind ────────────────────────────────────────────

/// Records every batch and then fails.
#[derive(Default)]
struct UnreachableSemantic {
    attempts: Mutex<Vec<Vec<Message>>>,
}

#[async_trait]
impl SemanticMemory for UnreachableSemantic {
    async fn store_messages(&self, messages: &[Message], _user_id: &str) -> Result<()> {
        self.attempts.lock().push(messages.to_vec());
        Err(Error::Http("503 Service Unavailable".into()))
    }

    async fn search_related(&self, _query: &str, _user_id: &str, _limit: u32) -> Result<RelatedMemories> {
        Err(Error::Http("503 Service Unavailable".into()))
    }
}

#[tokio::test]
async fn semantic_failure_does_not_fail_save_fact() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(dir.path(), "core").unwrap());
    let semantic = Arc::new(UnreachableSemantic::default());
    let registry = ToolRegistry::new();
    registry.register(Arc::new(
        SaveFactTool::new(store.clone(), "facts")
            .with_semantic(Some(semantic.clone() as Arc<dyn SemanticMemory>), "ada"),
    ));

    let out = registry
        .dispatch(
            &call("memory.save_fact", json!({"key": "travel", "content": "Ada flies to Oslo"})),
            &ToolContext::for_session("s1"),
        )
        .await;
    assert!(!out.is_error, "{}", out.content);
    assert!(store.get("facts", "travel").await.unwrap().unwrap().contains("Ada flies to Oslo"));

    for _ in 0..100 {
        if !semantic.attempts.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let attempts = semantic.attempts.lock().clone();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0][0].content, "Ada flies to Oslo");
}

// ── session.recall ───────────────────────────────────────────────────

async fn session_registry() -> (ToolRegistry, Arc<InMemorySessionStore>) {
    let sessions = Arc::new(InMemorySessionStore::new());
    let mut record = SessionRecord::new("trip");
    record.append_messages([
        Message::user("Our budget is 40k for the Oslo trip"),
        Message::assistant("Got it, a 40k budget."),
        Message::user("Book a window seat"),
        Message::assistant("Window seat requested."),
    ]);
    sessions.save(&record).await.unwrap();

    let registry = ToolRegistry::new();
    registry.register(Arc::new(SessionRecallTool::new(sessions.clone())));
    (registry, sessions)
}

#[tokio::test]
async fn session_recall_searches_the_ambient_session() {
    let (registry, _sessions) = session_registry().await;
    let out = registry
        .dispatch(
            &call("session.recall", json!({"keywords": ["budget", "window seat"], "limit": 1})),
            &ToolContext::for_session("trip"),
        )
        .await;
    assert!(!out.is_error, "{}", out.content);
    assert!(out.content.contains("### budget"));
    assert!(out.content.contains("[#1 assistant] Got it, a 40k budget."));
    assert!(!out.content.contains("Our budget is 40k"));
    assert!(out.content.contains("[#3 assistant] Window seat requested."));
}

#[tokio::test]
async fn session_recall_points_to_long_term_memory_when_nothing_matches() {
    let (registry, _sessions) = session_registry().await;
    let out = registry
        .dispatch(
            &call("session.recall", json!({"keywords": ["volcano"]})),
            &ToolContext::for_session("trip"),
        )
        .await;
    assert!(!out.is_error);
    assert!(out.content.contains("memory.recall"));

    let unknown = registry
        .dispatch(
            &call("session.recall", json!({"keywords": ["budget"]})),
            &ToolContext::for_session("someone-else"),
        )
        .await;
    assert!(!unknown.is_error);
    assert_eq!(unknown.content, "This conversation has no earlier messages.");
}

#[tokio::test]
async fn session_recall_needs_a_bound_session() {
    let (registry, _sessions) = session_registry().await;
    let out = registry
        .dispatch(&call("session.recall", json!({"keywords": ["budget"]})), &ToolContext::default())
        .await;
    assert!(out.is_error);
    assert!(out.content.contains("no session"));
}
