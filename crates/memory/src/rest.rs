//! REST implementation of [`SemanticMemory`].
//!
//! `RestSemanticMemory` wraps a `reqwest::Client` with automatic retry and
//! exponential back-off on transient (5xx / timeout) failures.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pv_domain::config::SemanticMemoryConfig;
use pv_domain::error::{Error, Result};
use pv_domain::tool::Message;
use pv_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use crate::semantic::{
    MemoryMessage, RelatedMemories, RelatedSearchEnvelope, RelatedSearchRequest, SemanticMemory,
    StoreMessagesRequest,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Created once and reused; the underlying client keeps a connection pool.
#[derive(Debug, Clone)]
pub struct RestSemanticMemory {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestSemanticMemory {
    pub fn new(cfg: &SemanticMemoryConfig) -> Result<Self> {
        let base_url = cfg
            .base_url
            .as_deref()
            .ok_or_else(|| Error::Config("memory.semantic.base_url is not set".into()))?
            .trim_end_matches('/')
            .to_owned();
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let rb = rb
            .header("X-Client-Type", "palaver")
            .header("X-Trace-Id", Uuid::new_v4().to_string());
        match self.api_key {
            Some(ref key) => rb.header("X-Api-Key", key),
            None => rb,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Retries 5xx responses and transport errors, never 4xx.
    /// Emits a `MemoryCall` trace event after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::MemoryCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::Memory(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }
                    if resp.status().is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(Error::Memory(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::MemoryCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Memory(format!("{endpoint}: all retries exhausted"))))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl SemanticMemory for RestSemanticMemory {
    async fn store_messages(&self, messages: &[Message], user_id: &str) -> Result<()> {
        let req = StoreMessagesRequest {
            messages: messages.iter().map(MemoryMessage::from).collect(),
            user_id: user_id.to_owned(),
        };
        let url = self.url("/api/messages");
        self.execute_with_retry("POST /api/messages", || self.http.post(&url).json(&req))
            .await?;
        Ok(())
    }

    async fn search_related(
        &self,
        query: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<RelatedMemories> {
        let req = RelatedSearchRequest {
            query: query.to_owned(),
            user_id: user_id.to_owned(),
            limit,
        };
        let url = self.url("/api/messages/related");
        let resp = self
            .execute_with_retry("POST /api/messages/related", || {
                self.http.post(&url).json(&req)
            })
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        let envelope: RelatedSearchEnvelope = serde_json::from_str(&body).map_err(|e| {
            Error::Memory(format!("failed to parse related-search response: {e}: {body}"))
        })?;
        if envelope.status != "success" {
            return Ok(RelatedMemories::default());
        }
        Ok(envelope.results.unwrap_or_default())
    }
}

/// Convert a `reqwest::Error` into a domain `Error`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(format!("timeout: {e}"))
    } else {
        Error::Http(e.to_string())
    }
}
