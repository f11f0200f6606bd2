//! The `MemoryStore` trait: category/key addressed durable facts.

use async_trait::async_trait;
use pv_domain::error::Result;

/// Durable fact storage partitioned into categories (`core`, `daily`, ...).
///
/// Implementations may be file-backed, database-backed, or a test double.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Read the fact stored under `category/key`.
    async fn get(&self, category: &str, key: &str) -> Result<Option<String>>;

    /// Write `text` under `category/key`. With `append`, the text is added
    /// after the existing content instead of replacing it.
    async fn save(&self, category: &str, key: &str, text: &str, append: bool) -> Result<()>;

    /// Case-insensitive search across one category, or all when `None`.
    /// Each hit is a short preview tagged with its source.
    async fn search(&self, query: &str, category: Option<&str>) -> Result<Vec<String>>;

    /// Keys stored in `category`, sorted.
    async fn list_keys(&self, category: &str) -> Result<Vec<String>>;
}
