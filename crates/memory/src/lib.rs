//! `pv-memory`: durable memory for Palaver.
//!
//! Two backends with different jobs:
//!
//! | Trait              | Implementation            | Holds                                   |
//! |--------------------|---------------------------|-----------------------------------------|
//! | [`MemoryStore`]    | [`MarkdownMemoryStore`]   | Core facts and daily archives as `.md`  |
//! | [`SemanticMemory`] | [`RestSemanticMemory`]    | Cross-session facts and graph relations |
//!
//! [`CoreMemoryBuilder`] combines both into the core-memory system message
//! injected at the head of every assembled view.

pub mod core_memory;
pub mod markdown;
pub mod rest;
pub mod semantic;
pub mod store;

pub use core_memory::CoreMemoryBuilder;
pub use markdown::MarkdownMemoryStore;
pub use rest::{from_reqwest, RestSemanticMemory};
pub use semantic::{MemoryHit, Relation, RelatedMemories, SemanticMemory};
pub use store::MemoryStore;

use std::sync::Arc;

use pv_domain::config::SemanticMemoryConfig;
use pv_domain::error::Result;

/// Build the semantic memory client, or `None` when no `base_url` is set.
pub fn create_semantic(cfg: &SemanticMemoryConfig) -> Result<Option<Arc<dyn SemanticMemory>>> {
    match cfg.base_url {
        Some(_) => {
            let client = RestSemanticMemory::new(cfg)?;
            tracing::info!(base_url = ?cfg.base_url, "semantic memory enabled");
            Ok(Some(Arc::new(client)))
        }
        None => {
            tracing::debug!("semantic memory disabled (no base_url)");
            Ok(None)
        }
    }
}
