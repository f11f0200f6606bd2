//! Provider registry.
//!
//! Holds the model providers available to one runtime and the roles they
//! serve. Each runtime builds its own registry, so tests and concurrent
//! configurations never share provider state.

use crate::traits::LlmProvider;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Role of the provider driving the execution loop.
pub const ROLE_EXECUTOR: &str = "executor";
/// Role of the provider producing synopses and archives.
pub const ROLE_SUMMARIZER: &str = "summarizer";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all registered model providers and role assignments.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn LlmProvider>>>,
    roles: RwLock<HashMap<String, String>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own [`LlmProvider::provider_id`].
    /// A provider with the same id is replaced.
    pub fn register(&self, provider: Arc<dyn LlmProvider>) {
        let id = provider.provider_id().to_string();
        let previous = self.providers.write().insert(id.clone(), provider);
        if previous.is_some() {
            tracing::warn!(provider_id = %id, "replaced existing provider");
        } else {
            tracing::info!(provider_id = %id, "registered model provider");
        }
    }

    /// Point `role` (e.g. [`ROLE_EXECUTOR`]) at the provider `provider_id`.
    /// Assigning an unknown id is allowed; `for_role` then returns `None`
    /// until that provider is registered.
    pub fn assign_role(&self, role: impl Into<String>, provider_id: impl Into<String>) {
        self.roles.write().insert(role.into(), provider_id.into());
    }

    /// Look up a provider by its id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.read().get(provider_id).cloned()
    }

    /// Get the provider assigned to a given role.
    pub fn for_role(&self, role: &str) -> Option<Arc<dyn LlmProvider>> {
        let provider_id = self.roles.read().get(role).cloned()?;
        self.get(&provider_id)
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List roles and their assigned provider ids.
    pub fn list_roles(&self) -> HashMap<String, String> {
        self.roles.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatRequest, ChatResponse};
    use pv_domain::capability::ModelCapabilities;
    use pv_domain::error::Result;

    struct Echo {
        id: String,
        caps: ModelCapabilities,
    }

    impl Echo {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.into(),
                caps: ModelCapabilities::default(),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for Echo {
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
            let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse::text(last))
        }
        fn capabilities(&self) -> &ModelCapabilities {
            &self.caps
        }
        fn provider_id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn roles_resolve_to_registered_providers() {
        let registry = ProviderRegistry::new();
        registry.register(Echo::new("main"));
        registry.register(Echo::new("cheap"));
        registry.assign_role(ROLE_EXECUTOR, "main");
        registry.assign_role(ROLE_SUMMARIZER, "cheap");

        assert_eq!(registry.for_role(ROLE_EXECUTOR).unwrap().provider_id(), "main");
        assert_eq!(registry.for_role(ROLE_SUMMARIZER).unwrap().provider_id(), "cheap");
        assert_eq!(registry.list_providers(), vec!["cheap", "main"]);
    }

    #[test]
    fn unknown_role_or_dangling_assignment_is_none() {
        let registry = ProviderRegistry::new();
        assert!(registry.for_role(ROLE_EXECUTOR).is_none());
        registry.assign_role(ROLE_EXECUTOR, "missing");
        assert!(registry.for_role(ROLE_EXECUTOR).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn separate_registries_do_not_share_state() {
        let a = ProviderRegistry::new();
        let b = ProviderRegistry::new();
        a.register(Echo::new("main"));
        assert_eq!(a.len(), 1);
        assert!(b.get("main").is_none());
    }

    #[tokio::test]
    async fn registered_provider_is_callable() {
        let registry = ProviderRegistry::new();
        registry.register(Echo::new("main"));
        let provider = registry.get("main").unwrap();
        let resp = provider
            .chat(ChatRequest {
                messages: vec![pv_domain::tool::Message::user("ping")],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.content, "ping");
        assert!(provider.estimate_size(&[]).is_none());
    }
}
