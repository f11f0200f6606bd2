use anyhow::Context;
use pv_domain::config::Config;
use pv_runtime::SessionSummary;
use pv_sessions::{FileSessionStore, SessionRecord, SessionStorage};

pub fn open_store(config: &Config) -> anyhow::Result<FileSessionStore> {
    FileSessionStore::new(config.sessions.dir.clone())
        .with_context(|| format!("opening session store {}", config.sessions.dir.display()))
}

/// Summaries of every stored session, most recently updated first.
pub async fn summaries(store: &dyn SessionStorage) -> anyhow::Result<Vec<SessionSummary>> {
    let mut out = Vec::new();
    for id in store.list_ids().await? {
        match store.load(&id).await? {
            Some(record) => out.push(SessionSummary::from(&record)),
            None => tracing::warn!(session_id = %id, "listed session could not be loaded"),
        }
    }
    out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(out)
}

pub async fn list(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let rows = summaries(&store).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No sessions in {}", config.sessions.dir.display());
        return Ok(());
    }
    for row in rows {
        println!(
            "{}  {}  {:>4} msgs  {:>2} epochs  {}",
            row.updated_at.format("%Y-%m-%d %H:%M"),
            row.session_id,
            row.message_count,
            row.summary_count,
            row.title.as_deref().unwrap_or("-"),
        );
        if let Some(preview) = row.preview {
            println!("    {preview}");
        }
    }
    Ok(())
}

pub async fn show(config: &Config, session_id: &str, json: bool) -> anyhow::Result<bool> {
    let store = open_store(config)?;
    let Some(record) = store.load(session_id).await? else {
        eprintln!("Session not found: {session_id}");
        return Ok(false);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", render_record(&record));
    }
    Ok(true)
}

pub async fn delete(config: &Config, session_id: &str) -> anyhow::Result<bool> {
    let store = open_store(config)?;
    let existed = store.delete(session_id).await?;
    if existed {
        println!("Deleted session {session_id}");
    } else {
        eprintln!("Session not found: {session_id}");
    }
    Ok(existed)
}

pub fn render_record(record: &SessionRecord) -> String {
    let mut out = format!(
        "Session {} ({})\ncreated {}  updated {}\n\n",
        record.session_id,
        record.title().unwrap_or("untitled"),
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.updated_at.format("%Y-%m-%d %H:%M:%S"),
    );
    for (i, msg) in record.messages.iter().enumerate() {
        out.push_str(&format!("[{i:>3}] {}\n", super::context::describe(msg)));
    }
    if !record.rolling_summaries.is_empty() {
        out.push_str("\nRolling summaries:\n");
        for s in &record.rolling_summaries {
            let flag = if s.low_information { " (low information)" } else { "" };
            out.push_str(&format!(
                "  {}..={}{flag}: {}\n",
                s.start_index, s.end_index, s.content
            ));
        }
    }
    out
}
