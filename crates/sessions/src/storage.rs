use async_trait::async_trait;
use pv_domain::error::Result;

use crate::record::SessionRecord;

/// Persistence boundary for session records.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Write the whole record, replacing any previous version.
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Returns whether a record existed.
    async fn delete(&self, session_id: &str) -> Result<bool>;

    async fn list_ids(&self) -> Result<Vec<String>>;
}
