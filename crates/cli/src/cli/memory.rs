use anyhow::Context;
use pv_domain::config::Config;
use pv_memory::{MarkdownMemoryStore, MemoryStore};

fn open_store(config: &Config) -> anyhow::Result<MarkdownMemoryStore> {
    MarkdownMemoryStore::new(config.memory.dir.clone(), config.memory.core_category.clone())
        .with_context(|| format!("opening memory store {}", config.memory.dir.display()))
}

pub async fn get(config: &Config, category: &str, key: &str) -> anyhow::Result<bool> {
    match open_store(config)?.get(category, key).await? {
        Some(text) => {
            println!("{text}");
            Ok(true)
        }
        None => {
            eprintln!("Nothing stored under {category}/{key}");
            Ok(false)
        }
    }
}

pub async fn search(config: &Config, query: &str, category: Option<&str>) -> anyhow::Result<()> {
    let hits = open_store(config)?.search(query, category).await?;
    if hits.is_empty() {
        println!("No matches for \"{query}\"");
    }
    for hit in hits {
        println!("{hit}\n");
    }
    Ok(())
}

pub async fn list(config: &Config, category: &str) -> anyhow::Result<()> {
    for key in open_store(config)?.list_keys(category).await? {
        println!("{key}");
    }
    Ok(())
}
