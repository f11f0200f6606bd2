use pv_domain::tool::Message;
use pv_sessions::{FileSessionStore, RollingSummary, SessionRecord, SessionStorage};
use tempfile::TempDir;

#[tokio::test]
async fn save_and_reload_from_a_fresh_store() {
    let dir = TempDir::new().unwrap();
    let mut record = SessionRecord::new("abc").with_title("Weather");
    record.append_messages([Message::user("hi"), Message::assistant("hello")]);
    record.push_summary(RollingSummary::new("greeting", 0, 0)).unwrap();

    FileSessionStore::new(dir.path()).unwrap().save(&record).await.unwrap();

    let reopened = FileSessionStore::new(dir.path()).unwrap();
    let loaded = reopened.load("abc").await.unwrap().unwrap();
    assert_eq!(loaded.messages, record.messages);
    assert_eq!(loaded.rolling_summaries, record.rolling_summaries);
    assert_eq!(loaded.title(), Some("Weather"));
}

#[tokio::test]
async fn missing_and_corrupt_files_read_as_absent() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    let store = FileSessionStore::new(dir.path()).unwrap();

    assert!(store.load("nope").await.unwrap().is_none());
    assert!(store.load("broken").await.unwrap().is_none());
}

#[tokio::test]
async fn list_and_delete() {
    let dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(dir.path()).unwrap();
    store.save(&SessionRecord::new("b")).await.unwrap();
    store.save(&SessionRecord::new("a")).await.unwrap();

    assert_eq!(store.list_ids().await.unwrap(), vec!["a", "b"]);
    assert!(store.delete("a").await.unwrap());
    assert!(!store.delete("a").await.unwrap());
    assert!(store.load("a").await.unwrap().is_none());
    assert_eq!(store.list_ids().await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn ids_cannot_escape_the_directory() {
    let dir = TempDir::new().unwrap();
    let sessions = dir.path().join("sessions");
    let store = FileSessionStore::new(&sessions).unwrap();
    store.save(&SessionRecord::new("../evil")).await.unwrap();

    assert!(!dir.path().join("evil.json").exists());
    assert!(sessions.join("___evil.json").exists());
}
