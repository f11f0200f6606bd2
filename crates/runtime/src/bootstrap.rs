//! Wiring a [`SessionManager`] from configuration and a provider registry.
//!
//! Model adapters are constructed by the embedding application and handed
//! in through the registry; everything else is built here.

use std::sync::Arc;

use pv_domain::config::Config;
use pv_domain::error::{Error, Result};
use pv_memory::{create_semantic, MarkdownMemoryStore, MemoryStore, SemanticMemory};
use pv_providers::{ProviderRegistry, ROLE_EXECUTOR, ROLE_SUMMARIZER};
use pv_sessions::{FileSessionStore, SessionStorage};
use pv_tools::{RecallTool, SaveFactTool, SessionRecallTool, ToolRegistry};

use crate::archive::Archiver;
use crate::executor::AgentExecutor;
use crate::manager::SessionManager;
use crate::summarizer::{LlmSummarizer, Summarizer};

/// Everything a host needs to serve messages.
pub struct Runtime {
    pub manager: Arc<SessionManager>,
    pub memory: Arc<dyn MemoryStore>,
    pub semantic: Option<Arc<dyn SemanticMemory>>,
    pub tools: Arc<ToolRegistry>,
}

/// Memory store and semantic client from config.
pub fn build_memory(config: &Config) -> Result<(Arc<dyn MemoryStore>, Option<Arc<dyn SemanticMemory>>)> {
    let store: Arc<dyn MemoryStore> = Arc::new(MarkdownMemoryStore::new(
        config.memory.dir.clone(),
        config.memory.core_category.clone(),
    )?);
    tracing::info!(path = %config.memory.dir.display(), "memory store ready");
    let semantic = create_semantic(&config.memory.semantic)?;
    Ok((store, semantic))
}

/// Registry holding the built-in memory and session tools.
pub fn build_tools(
    config: &Config,
    store: Arc<dyn MemoryStore>,
    semantic: Option<Arc<dyn SemanticMemory>>,
    sessions: Arc<dyn SessionStorage>,
) -> Arc<ToolRegistry> {
    let sem = &config.memory.semantic;
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(
        SaveFactTool::new(store.clone(), config.memory.core_category.clone())
            .with_semantic(semantic.clone(), sem.user_id.clone()),
    ));
    tools.register(Arc::new(
        RecallTool::new(store).with_semantic(semantic, sem.user_id.clone(), sem.search_limit),
    ));
    tools.register(Arc::new(SessionRecallTool::new(sessions)));
    tracing::info!(tools = tools.len(), "tool registry ready");
    tools
}

/// Validate `config` and wire the full runtime. The registry must have a
/// provider assigned to the executor role; the summarizer role falls back
/// to the executor.
pub fn build_runtime(config: &Config, providers: &ProviderRegistry) -> Result<Runtime> {
    config.validate()?;

    let executor_provider = providers.for_role(ROLE_EXECUTOR).ok_or_else(|| {
        Error::Config(format!("no provider assigned to the '{ROLE_EXECUTOR}' role"))
    })?;
    let summarizer_provider = providers
        .for_role(ROLE_SUMMARIZER)
        .unwrap_or_else(|| executor_provider.clone());
    tracing::info!(
        executor = executor_provider.provider_id(),
        summarizer = summarizer_provider.provider_id(),
        "providers resolved"
    );

    let (memory, semantic) = build_memory(config)?;
    let storage: Arc<dyn SessionStorage> = Arc::new(FileSessionStore::new(config.sessions.dir.clone())?);
    let tools = build_tools(config, memory.clone(), semantic.clone(), storage.clone());

    let summarizer: Arc<dyn Summarizer> = Arc::new(LlmSummarizer::new(summarizer_provider));
    let archiver = Arc::new(Archiver::new(
        summarizer.clone(),
        memory.clone(),
        config.memory.archive_category.clone(),
    ));
    let executor = Arc::new(
        AgentExecutor::new(executor_provider, tools.clone(), config)
            .with_summarizer(summarizer)
            .with_archiver(archiver),
    );

    let manager = Arc::new(
        SessionManager::new(storage, executor, memory.clone(), config)
            .with_semantic(semantic.clone()),
    );

    Ok(Runtime {
        manager,
        memory,
        semantic,
        tools,
    })
}
