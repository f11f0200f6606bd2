//! The `SemanticMemory` trait and the DTOs of the external semantic
//! memory service (vector facts plus a knowledge graph).

use async_trait::async_trait;
use pv_domain::error::Result;
use pv_domain::tool::Message;
use serde::{Deserialize, Serialize};

/// Cross-session fact extraction and retrieval.
///
/// Implementations talk to the real service or act as a test double.
#[async_trait]
pub trait SemanticMemory: Send + Sync {
    /// Hand conversation messages to the service for fact extraction.
    async fn store_messages(&self, messages: &[Message], user_id: &str) -> Result<()>;

    /// Facts and graph relations related to `query`.
    async fn search_related(&self, query: &str, user_id: &str, limit: u32)
        -> Result<RelatedMemories>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One message as the service expects it: role and text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for MemoryMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }
    }
}

/// POST /api/messages request body.
#[derive(Debug, Clone, Serialize)]
pub struct StoreMessagesRequest {
    pub messages: Vec<MemoryMessage>,
    pub user_id: String,
}

/// POST /api/messages/related request body.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedSearchRequest {
    pub query: String,
    pub user_id: String,
    pub limit: u32,
}

/// POST /api/messages/related response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedSearchEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Option<RelatedMemories>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedMemories {
    #[serde(default)]
    pub results: Vec<MemoryHit>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    #[serde(default)]
    pub id: String,
    pub memory: String,
    #[serde(default)]
    pub score: f64,
}

/// A `source -[relationship]-> target` edge of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub relationship: String,
    pub target: String,
}

impl RelatedMemories {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.relations.is_empty()
    }

    /// Non-empty fact texts, de-duplicated in order.
    pub fn fact_lines(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.results
            .iter()
            .map(|h| h.memory.trim())
            .filter(|m| !m.is_empty() && seen.insert(m.to_string()))
            .map(str::to_string)
            .collect()
    }

    pub fn relation_lines(&self) -> Vec<String> {
        self.relations
            .iter()
            .map(|r| format!("{} {} {}", r.source, r.relationship, r.target))
            .collect()
    }

    /// Bullet-list rendering used by tools and the core-memory builder.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let facts = self.fact_lines();
        if !facts.is_empty() {
            out.push_str("Facts:\n");
            for f in &facts {
                out.push_str(&format!("- {f}\n"));
            }
        }
        let relations = self.relation_lines();
        if !relations.is_empty() {
            out.push_str("Related entities:\n");
            for r in &relations {
                out.push_str(&format!("- {r}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_success_payload() {
        let body = r#"{
            "status": "success",
            "results": {
                "results": [{"id": "1", "memory": "Ada writes Rust", "score": 0.9}],
                "relations": [{"source": "Ada", "relationship": "works_at", "target": "Acme"}]
            }
        }"#;
        let env: RelatedSearchEnvelope = serde_json::from_str(body).unwrap();
        let related = env.results.unwrap();
        assert_eq!(related.fact_lines(), vec!["Ada writes Rust"]);
        assert_eq!(related.relation_lines(), vec!["Ada works_at Acme"]);
    }

    #[test]
    fn fact_lines_dedup_and_skip_blank() {
        let related = RelatedMemories {
            results: vec![
                MemoryHit { id: "1".into(), memory: "a".into(), score: 1.0 },
                MemoryHit { id: "2".into(), memory: " a ".into(), score: 0.5 },
                MemoryHit { id: "3".into(), memory: "  ".into(), score: 0.1 },
            ],
            relations: vec![],
        };
        assert_eq!(related.fact_lines(), vec!["a"]);
        assert!(related.render().starts_with("Facts:\n- a\n"));
    }

    #[test]
    fn store_request_keeps_role_and_content_only() {
        let mut msg = Message::assistant("done");
        msg.tool_name = Some("ignored".into());
        let req = StoreMessagesRequest {
            messages: vec![MemoryMessage::from(&msg)],
            user_id: "u".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["messages"][0],
            serde_json::json!({"role": "assistant", "content": "done"})
        );
    }
}
