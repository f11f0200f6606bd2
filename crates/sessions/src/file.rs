//! JSON-file [`SessionStorage`].
//!
//! Each session is stored whole as `<dir>/<sanitized id>.json`. Reads go
//! through an in-memory cache; writes hit disk first and only update the
//! cache when the I/O succeeded. File I/O runs on the blocking pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use pv_domain::error::{Error, Result};

use crate::record::SessionRecord;
use crate::storage::SessionStorage;

pub struct FileSessionStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, SessionRecord>>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(path = %dir.display(), "session store ready");
        Ok(Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_id(session_id)))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        // Fast path: cached.
        if let Some(record) = self.cache.read().get(session_id) {
            return Ok(Some(record.clone()));
        }

        let path = self.path_for(session_id);
        let loaded = blocking(move || match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable session file, treating as absent");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        })
        .await?;

        if let Some(ref record) = loaded {
            self.cache
                .write()
                .insert(session_id.to_owned(), record.clone());
        }
        Ok(loaded)
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.path_for(&record.session_id);
        let buf = serde_json::to_string_pretty(record)?;

        blocking(move || {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, buf)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
        .await?;

        self.cache
            .write()
            .insert(record.session_id.clone(), record.clone());
        tracing::debug!(session_id = %record.session_id, messages = record.messages.len(), "session written");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.cache.write().remove(session_id);
        let path = self.path_for(session_id);
        blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        })
        .await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        blocking(move || {
            let mut ids = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "json") {
                    if let Some(stem) = path.file_stem() {
                        ids.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
            ids.sort();
            Ok(ids)
        })
        .await
    }
}

/// Keep ids to a safe file-name alphabet.
pub fn sanitize_id(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".into()
    } else {
        cleaned
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}
