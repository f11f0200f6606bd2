//! Session-level orchestration: one incoming user message in, one reply
//! out, with rolling summaries, core memory and persistence around the
//! execution loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pv_domain::background::spawn_detached;
use pv_domain::config::Config;
use pv_domain::error::{Error, Result};
use pv_domain::tool::{Message, Role};
use pv_domain::trace::TraceEvent;
use pv_memory::{CoreMemoryBuilder, MemoryStore, SemanticMemory};
use pv_sessions::{SessionLockMap, SessionRecord, SessionStorage};
use serde::Serialize;
use tracing::Instrument;

use crate::executor::{AgentExecutor, ExecuteOptions, RunStatus};
use crate::rolling::{assemble_view, RollingSummaryManager};

const PREVIEW_CHARS: usize = 80;

/// Result of one handled message.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    pub reply: String,
    pub status: RunStatus,
    pub steps: usize,
    /// Messages appended to the raw transcript, the user message included.
    pub appended: usize,
}

/// One row of `list_sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub summary_count: usize,
    pub preview: Option<String>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(r: &SessionRecord) -> Self {
        Self {
            session_id: r.session_id.clone(),
            title: r.title().map(str::to_string),
            created_at: r.created_at,
            updated_at: r.updated_at,
            message_count: r.messages.len(),
            summary_count: r.rolling_summaries.len(),
            preview: r.preview(PREVIEW_CHARS),
        }
    }
}

pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    executor: Arc<AgentExecutor>,
    rolling: RollingSummaryManager,
    memory: Arc<dyn MemoryStore>,
    semantic: Option<Arc<dyn SemanticMemory>>,
    locks: SessionLockMap,
    config: Config,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        executor: Arc<AgentExecutor>,
        memory: Arc<dyn MemoryStore>,
        config: &Config,
    ) -> Self {
        let rolling =
            RollingSummaryManager::new(executor.summarizer().cloned(), config.rolling.clone());
        Self {
            storage,
            executor,
            rolling,
            memory,
            semantic: None,
            locks: SessionLockMap::new(),
            config: config.clone(),
        }
    }

    pub fn with_semantic(mut self, semantic: Option<Arc<dyn SemanticMemory>>) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    pub fn executor(&self) -> &Arc<AgentExecutor> {
        &self.executor
    }

    // ── Turn handling ─────────────────────────────────────────────────

    /// Append `text` to the session, run the loop over the assembled view
    /// and persist everything the loop produced.
    ///
    /// Turns for the same session are serialized. A failed model call is
    /// answered with the configured failure message and
    /// `RunStatus::Failed`; only storage errors are returned as `Err`.
    pub async fn handle_incoming_message(&self, session_id: &str, text: &str) -> Result<TurnReply> {
        let span = tracing::info_span!("session.turn", session_id);
        let result = self.turn(session_id, text).instrument(span).await;
        self.locks.prune_idle();
        result
    }

    /// Sessions with a live run lock: a turn in flight or waiting.
    pub fn locked_sessions(&self) -> usize {
        self.locks.session_count()
    }

    async fn turn(&self, session_id: &str, text: &str) -> Result<TurnReply> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(Error::Session("session id must not be empty".into()));
        }
        let _permit = self.locks.acquire(session_id).await?;

        let (mut record, is_new) = match self.storage.load(session_id).await? {
            Some(r) => (r, false),
            None => {
                tracing::info!(session_id, "starting new session");
                let r = SessionRecord::new(session_id).with_title(&self.config.sessions.default_title);
                (r, true)
            }
        };
        let raw_before = record.messages.len();
        record.append_messages([Message::user(text)]);

        // ── Onboarding ──────────────────────────────────────────────
        if is_new && self.config.sessions.require_profile && !self.has_profile().await {
            tracing::info!(session_id, "no stored profile; asking for one");
            let greeting = self.config.sessions.onboarding_message.clone();
            record.append_messages([Message::assistant(greeting.clone())]);
            self.storage.save(&record).await?;
            return Ok(TurnReply {
                session_id: session_id.to_string(),
                reply: greeting,
                status: RunStatus::Onboarding,
                steps: 0,
                appended: record.messages.len() - raw_before,
            });
        }

        // ── Rolling epoch ───────────────────────────────────────────
        if let Err(e) = self.rolling.maybe_roll(&mut record).await {
            tracing::warn!(session_id, error = %e, "rolling summary skipped this turn");
        }

        // ── Assemble + run ──────────────────────────────────────────
        let core = self.core_memory_message().await;
        let mut view = assemble_view(&record, core);
        let input_len = view.len();

        let opts = ExecuteOptions::for_session(session_id);
        let (reply, status, steps) = match self.executor.execute(&mut view, &opts).await {
            Ok(outcome) => (outcome.reply, outcome.status, outcome.steps),
            Err(e) => {
                tracing::error!(session_id, error = %e, "execution failed");
                let failure = self.config.agent.failure_message.clone();
                view.push(Message::assistant(failure.clone()));
                (failure, RunStatus::Failed, 0)
            }
        };

        // ── Persist the diff ────────────────────────────────────────
        let produced = view.split_off(input_len.min(view.len()));
        record.append_messages(produced.iter().cloned());
        self.storage.save(&record).await?;

        let appended = record.messages.len() - raw_before;
        TraceEvent::SessionSaved {
            session_id: session_id.to_string(),
            messages: record.messages.len(),
            appended,
        }
        .emit();

        if status == RunStatus::Completed {
            self.capture_to_semantic(&record, &produced);
        }

        Ok(TurnReply {
            session_id: session_id.to_string(),
            reply,
            status,
            steps,
            appended,
        })
    }

    /// The core-memory system message, or `None` when there is nothing to
    /// say. Never fails.
    pub async fn core_memory_message(&self) -> Option<Message> {
        CoreMemoryBuilder::new(self.memory.as_ref(), &self.config.memory)
            .with_semantic(self.semantic.as_deref())
            .with_system_prompt(self.config.agent.system_prompt.clone())
            .build_message()
            .await
    }

    /// Whether any configured core profile fact is stored. Lookup errors
    /// count as absent.
    async fn has_profile(&self) -> bool {
        let mem = &self.config.memory;
        for key in &mem.core_keys {
            match self.memory.get(&mem.core_category, key).await {
                Ok(Some(text)) if !text.trim().is_empty() => return true,
                Ok(_) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "profile lookup failed"),
            }
        }
        false
    }

    /// The view the loop would receive for `session_id` right now,
    /// without rolling a new epoch.
    pub async fn context_view(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        let Some(record) = self.storage.load(session_id).await? else {
            return Ok(None);
        };
        let core = self.core_memory_message().await;
        Ok(Some(assemble_view(&record, core)))
    }

    /// Hand the latest user message and the plain assistant replies of
    /// this turn to semantic memory in the background.
    fn capture_to_semantic(&self, record: &SessionRecord, produced: &[Message]) {
        if !self.config.memory.auto_capture {
            return;
        }
        let Some(semantic) = self.semantic.clone() else {
            return;
        };
        let Some(last_user) = record.messages.iter().rev().find(|m| m.role == Role::User) else {
            return;
        };
        let replies: Vec<Message> = produced
            .iter()
            .filter(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .cloned()
            .collect();
        if replies.is_empty() {
            return;
        }
        let mut batch = Vec::with_capacity(replies.len() + 1);
        batch.push(last_user.clone());
        batch.extend(replies);

        let user_id = self.config.memory.semantic.user_id.clone();
        spawn_detached("semantic_capture", async move {
            semantic.store_messages(&batch, &user_id).await
        });
    }

    // ── Session administration ────────────────────────────────────────

    pub async fn create_session(&self, title: Option<&str>) -> Result<SessionRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let title = title.unwrap_or(&self.config.sessions.default_title);
        let record = SessionRecord::new(id).with_title(title);
        self.storage.save(&record).await?;
        tracing::info!(session_id = %record.session_id, "session created");
        Ok(record)
    }

    /// Every stored session, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut out = Vec::new();
        for id in self.storage.list_ids().await? {
            if let Some(record) = self.storage.load(&id).await? {
                out.push(SessionSummary::from(&record));
            }
        }
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    pub async fn history(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.storage.load(session_id).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let permit = self.locks.acquire(session_id).await?;
        let existed = self.storage.delete(session_id).await?;
        if existed {
            TraceEvent::SessionDeleted {
                session_id: session_id.to_string(),
            }
            .emit();
        }
        drop(permit);
        self.locks.prune_idle();
        Ok(existed)
    }
}
