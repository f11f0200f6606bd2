//! The agent execution loop.
//!
//! One call to [`AgentExecutor::execute`] runs think/act steps until the
//! model answers without tool calls or the step cap is reached. The caller's
//! list only ever grows: every message the loop produces is appended to it,
//! while compaction works on a private running copy, so the new messages
//! can be recovered with `split_off(input_len)`.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use pv_domain::config::{AgentConfig, Config};
use pv_domain::error::{Error, Result};
use pv_domain::tool::{Message, ToolCall, ToolDefinition};
use pv_providers::{ChatRequest, ChatResponse, LlmProvider, Usage};
use pv_tools::{ToolContext, ToolDispatch, ToolRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::archive::Archiver;
use crate::blocks::{chunk_into_blocks, validate_tool_pairing};
use crate::compaction::Compactor;
use crate::sizing::{CharHeuristic, ProviderSizer};
use crate::summarizer::Summarizer;
use crate::window::build_window;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options and outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-run overrides. Unset fields fall back to the executor's config.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Passed to tools through `ToolContext`, never as a model-visible
    /// parameter.
    pub session_id: Option<String>,
    pub max_steps: Option<usize>,
    /// Tool catalog advertised to the model instead of the registry's.
    pub tools: Option<Vec<ToolDefinition>>,
    pub temperature: Option<f32>,
    /// Extra ambient values for tools.
    pub extras: Map<String, Value>,
}

impl ExecuteOptions {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    fn tool_context(&self) -> ToolContext {
        let mut ctx = match &self.session_id {
            Some(id) => ToolContext::for_session(id.clone()),
            None => ToolContext::default(),
        };
        ctx.extras.extend(self.extras.clone());
        ctx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model produced a final answer.
    Completed,
    /// The step cap was reached; the reply is the configured apology.
    Aborted,
    /// The model invocation failed; the reply is the generic failure text.
    Failed,
    /// A new session without a stored profile was greeted with the
    /// onboarding message; the loop did not run.
    Onboarding,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reply: String,
    pub status: RunStatus,
    /// Model invocations made.
    pub steps: usize,
    pub usage: Usage,
    /// Messages appended to the caller's list.
    pub appended: usize,
    /// Times the running transcript was folded.
    pub compactions: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AgentExecutor {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    summarizer: Option<Arc<dyn Summarizer>>,
    archiver: Option<Arc<Archiver>>,
    compactor: Compactor,
    agent: AgentConfig,
}

impl AgentExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: &Config) -> Self {
        let sizer = Arc::new(ProviderSizer::new(
            provider.clone(),
            CharHeuristic::from(&config.window),
        ));
        Self {
            provider,
            tools,
            summarizer: None,
            archiver: None,
            compactor: Compactor::new(config.compaction.clone(), sizer),
            agent: config.agent.clone(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_archiver(mut self, archiver: Arc<Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    pub fn summarizer(&self) -> Option<&Arc<dyn Summarizer>> {
        self.summarizer.as_ref()
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn agent_config(&self) -> &AgentConfig {
        &self.agent
    }

    /// Per-step window budget from the provider's capabilities.
    pub fn budget(&self) -> usize {
        self.provider.capabilities().budget()
    }

    /// Run the loop over `messages`, appending every produced message.
    ///
    /// Only a failed model invocation is returned as an error; tool
    /// failures become result text and the step cap ends the run with
    /// `RunStatus::Aborted`.
    pub async fn execute(
        &self,
        messages: &mut Vec<Message>,
        opts: &ExecuteOptions,
    ) -> Result<RunOutcome> {
        let max_steps = opts.max_steps.unwrap_or(self.agent.max_steps).max(1);
        let span = tracing::info_span!(
            "agent.run",
            session_id = opts.session_id.as_deref().unwrap_or("-"),
            provider = self.provider.provider_id(),
            max_steps,
        );
        self.run_loop(messages, opts, max_steps).instrument(span).await
    }

    async fn run_loop(
        &self,
        messages: &mut Vec<Message>,
        opts: &ExecuteOptions,
        max_steps: usize,
    ) -> Result<RunOutcome> {
        validate_tool_pairing(messages);

        let input_len = messages.len();
        let mut context = messages.clone();
        let tool_defs = self.advertised_tools(opts);
        let tool_ctx = opts.tool_context();
        let budget = self.budget();
        let mut usage = Usage::default();
        let mut compactions = 0;
        let mut steps = 0;

        while steps < max_steps {
            steps += 1;

            // ── Compaction ──────────────────────────────────────────
            let over_threshold = self.compact_if_needed(&mut context, &mut compactions).await;

            // ── Window + model call ─────────────────────────────────
            let window = build_window(chunk_into_blocks(&context), budget, self.compactor.sizer());
            window.report.emit();

            let req = ChatRequest {
                messages: window.into_messages(),
                tools: tool_defs.clone(),
                temperature: Some(opts.temperature.unwrap_or(self.agent.temperature)),
                ..Default::default()
            };
            let resp = self.call_model(req, steps).await?;
            if let Some(u) = &resp.usage {
                usage.accumulate(u);
            }

            // ── Done ────────────────────────────────────────────────
            if resp.tool_calls.is_empty() {
                let reply = Message::assistant(resp.content.clone());
                messages.push(reply);
                tracing::debug!(steps, "run completed");
                return Ok(self.finish(messages, input_len, RunOutcome {
                    reply: resp.content,
                    status: RunStatus::Completed,
                    steps,
                    usage,
                    appended: 0,
                    compactions,
                }));
            }

            // ── Act ─────────────────────────────────────────────────
            let request = Message::assistant_with_tool_calls(resp.content, resp.tool_calls.clone());
            messages.push(request.clone());
            context.push(request);

            let results = self.dispatch_all(&resp.tool_calls, &tool_ctx).await;
            for (call, dispatch) in resp.tool_calls.iter().zip(results) {
                let content = self.compactor.truncate_result(&dispatch.content, over_threshold);
                let result = Message::tool_result(&call.call_id, &call.tool_name, content);
                messages.push(result.clone());
                context.push(result);
            }
        }

        tracing::warn!(steps, max_steps, "step cap reached; aborting run");
        let apology = self.agent.abort_message.clone();
        messages.push(Message::assistant(apology.clone()));
        Ok(self.finish(messages, input_len, RunOutcome {
            reply: apology,
            status: RunStatus::Aborted,
            steps,
            usage,
            appended: 0,
            compactions,
        }))
    }

    fn advertised_tools(&self, opts: &ExecuteOptions) -> Vec<ToolDefinition> {
        if !self.provider.capabilities().supports_tools {
            return Vec::new();
        }
        match &opts.tools {
            Some(defs) => defs.clone(),
            None => self.tools.definitions(),
        }
    }

    /// Fold the running transcript when it is over the threshold. Returns
    /// whether it is still over afterwards, which tightens the cap on
    /// fresh tool results.
    async fn compact_if_needed(&self, context: &mut Vec<Message>, compactions: &mut usize) -> bool {
        if !self.compactor.needs_compaction(context) {
            return false;
        }
        let Some(summarizer) = &self.summarizer else {
            return true;
        };
        match self.compactor.compact(context, summarizer.as_ref()).await {
            Ok(Some(report)) => {
                *compactions += 1;
                report.still_over
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(error = %e, "compaction failed; falling back to truncation");
                true
            }
        }
    }

    async fn call_model(&self, req: ChatRequest, step: usize) -> Result<ChatResponse> {
        let span = tracing::info_span!(
            "llm.call",
            step,
            messages = req.messages.len(),
            tools = req.tools.len(),
        );
        let started = Instant::now();
        let provider_id = self.provider.provider_id().to_string();
        let result = self.provider.chat(req).instrument(span).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(resp) => {
                tracing::debug!(
                    step,
                    duration_ms,
                    tool_calls = resp.tool_calls.len(),
                    "model responded"
                );
                Ok(resp)
            }
            Err(e @ Error::Provider { .. }) => Err(e),
            Err(e) => Err(Error::Provider {
                provider: provider_id,
                message: e.to_string(),
            }),
        }
    }

    /// Dispatch the calls of one step. Results come back in request
    /// order whether or not the calls ran concurrently.
    async fn dispatch_all(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<ToolDispatch> {
        if self.agent.concurrent_tools {
            join_all(calls.iter().map(|call| self.tools.dispatch(call, ctx))).await
        } else {
            let mut out = Vec::with_capacity(calls.len());
            for call in calls {
                out.push(self.tools.dispatch(call, ctx).await);
            }
            out
        }
    }

    fn finish(&self, messages: &[Message], input_len: usize, mut outcome: RunOutcome) -> RunOutcome {
        outcome.appended = messages.len() - input_len;
        if let Some(archiver) = &self.archiver {
            if messages.len() >= self.agent.archive_min_messages {
                archiver.spawn(messages.to_vec());
            }
        }
        outcome
    }
}
