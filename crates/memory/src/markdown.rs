//! File-backed [`MemoryStore`]: one Markdown file per key.
//!
//! Layout: `<dir>/<category>/<key>.md`. Both path components are sanitized
//! so a key can never escape its category directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pv_domain::error::{Error, Result};
use pv_domain::text::truncate_chars;

use crate::store::MemoryStore;

/// Characters kept in each search preview.
const PREVIEW_CHARS: usize = 300;

pub struct MarkdownMemoryStore {
    dir: PathBuf,
    /// Appends to this category are not separated by a timestamp rule.
    core_category: String,
}

impl MarkdownMemoryStore {
    pub fn new(dir: impl Into<PathBuf>, core_category: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            core_category: sanitize_component(&core_category.into()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, category: &str, key: &str) -> PathBuf {
        self.dir
            .join(sanitize_component(category))
            .join(format!("{}.md", sanitize_component(key)))
    }
}

#[async_trait]
impl MemoryStore for MarkdownMemoryStore {
    async fn get(&self, category: &str, key: &str) -> Result<Option<String>> {
        let path = self.file_path(category, key);
        blocking(move || match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn save(&self, category: &str, key: &str, text: &str, append: bool) -> Result<()> {
        let path = self.file_path(category, key);
        let is_core = sanitize_component(category) == self.core_category;
        let text = text.to_string();

        blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if append && path.exists() {
                use std::io::Write;
                let separator = if is_core {
                    "\n".to_string()
                } else {
                    format!(
                        "\n\n---\n*Updated: {}*\n\n",
                        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
                    )
                };
                let mut file = std::fs::OpenOptions::new().append(true).open(&path)?;
                file.write_all(separator.as_bytes())?;
                file.write_all(text.as_bytes())?;
            } else {
                std::fs::write(&path, text)?;
            }
            Ok(())
        })
        .await?;

        tracing::debug!(category, key, append, "memory fact saved");
        Ok(())
    }

    async fn search(&self, query: &str, category: Option<&str>) -> Result<Vec<String>> {
        let root = self.dir.clone();
        let category = category.map(sanitize_component);
        let needle = query.to_lowercase();

        blocking(move || {
            let categories = match category {
                Some(c) => vec![c],
                None => list_subdirs(&root)?,
            };
            let mut hits = Vec::new();
            for cat in categories {
                let cat_dir = root.join(&cat);
                if !cat_dir.is_dir() {
                    continue;
                }
                for file in markdown_files(&cat_dir)? {
                    let content = match std::fs::read_to_string(&file) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!(path = %file.display(), error = %e, "skipping unreadable memory file");
                            continue;
                        }
                    };
                    if !content.to_lowercase().contains(&needle) {
                        continue;
                    }
                    let source = file
                        .strip_prefix(&root)
                        .unwrap_or(&file)
                        .to_string_lossy()
                        .replace('\\', "/");
                    let (preview, _) = truncate_chars(&content, PREVIEW_CHARS, "...");
                    hits.push(format!("[source: {source}]\n{preview}"));
                }
            }
            Ok(hits)
        })
        .await
    }

    async fn list_keys(&self, category: &str) -> Result<Vec<String>> {
        let cat_dir = self.dir.join(sanitize_component(category));
        blocking(move || {
            if !cat_dir.is_dir() {
                return Ok(Vec::new());
            }
            let mut keys: Vec<String> = markdown_files(&cat_dir)?
                .into_iter()
                .filter_map(|p| {
                    let rel = p.strip_prefix(&cat_dir).ok()?.to_string_lossy().replace('\\', "/");
                    rel.strip_suffix(".md").map(str::to_string)
                })
                .collect();
            keys.sort();
            Ok(keys)
        })
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reduce a category or key to a single safe path component.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".into()
    } else {
        cleaned.to_string()
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Memory(format!("blocking task failed: {e}")))?
}

fn list_subdirs(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// All `.md` files under `dir`, recursively, in sorted order.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "md") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}
