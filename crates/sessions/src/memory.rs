//! In-process [`SessionStorage`] for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use pv_domain::error::Result;

use crate::record::SessionRecord;
use crate::storage::SessionStorage;

#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.read().get(session_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.records.write().remove(session_id).is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
