//! Archival of finished runs into the durable store's daily category.

use std::sync::Arc;

use chrono::Utc;
use pv_domain::background::spawn_detached;
use pv_domain::error::Result;
use pv_domain::tool::Message;
use pv_memory::MemoryStore;
use tokio::task::JoinHandle;

use crate::summarizer::{Summarizer, Synopsis};

pub struct Archiver {
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn MemoryStore>,
    category: String,
}

impl Archiver {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn MemoryStore>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            summarizer,
            store,
            category: category.into(),
        }
    }

    /// Key of today's archive entry, `YYYY-MM-DD` in UTC.
    pub fn today_key() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Summarize `messages` and append the synopsis to today's entry.
    /// Returns whether anything was written.
    pub async fn archive(&self, messages: &[Message]) -> Result<bool> {
        match self.summarizer.summarize(messages, None).await? {
            Synopsis::Text(text) => {
                let key = Self::today_key();
                self.store.save(&self.category, &key, &text, true).await?;
                tracing::info!(
                    category = %self.category,
                    key = %key,
                    messages = messages.len(),
                    "run archived"
                );
                Ok(true)
            }
            Synopsis::NoKeyFacts => {
                tracing::debug!(messages = messages.len(), "nothing worth archiving");
                Ok(false)
            }
        }
    }

    /// Archive `snapshot` in the background.
    pub fn spawn(self: &Arc<Self>, snapshot: Vec<Message>) -> JoinHandle<()> {
        let archiver = Arc::clone(self);
        spawn_detached("archive", async move {
            archiver.archive(&snapshot).await.map(|_| ())
        })
    }
}
