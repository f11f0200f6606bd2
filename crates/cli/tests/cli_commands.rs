use pv_cli::cli::{context, load_config_from, sessions};
use pv_domain::config::{Config, LogFormat};
use pv_domain::tool::{Message, Role, ToolCall};
use pv_sessions::{FileSessionStore, RollingSummary, SessionRecord, SessionStorage};
use serde_json::json;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.memory.dir = dir.path().join("memory");
    config.sessions.dir = dir.path().join("sessions");
    config
}

#[test]
fn missing_config_file_means_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.agent.max_steps, Config::default().agent.max_steps);
}

#[test]
fn config_file_overrides_and_reports_parse_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[agent]\nmax_steps = 7\n\n[observability]\nlog_format = \"json\"\n",
    )
    .unwrap();
    let config = load_config_from(&path).unwrap();
    assert_eq!(config.agent.max_steps, 7);
    assert_eq!(config.observability.log_format, LogFormat::Json);

    std::fs::write(&path, "[agent\nmax_steps = ").unwrap();
    let err = load_config_from(&path).unwrap_err();
    assert!(err.to_string().contains("parsing"));
}

#[tokio::test]
async fn context_shows_core_then_epochs_then_tail() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let mut record = SessionRecord::new("s1");
    record.append_messages((0..6).map(|i| Message::user(format!("m{i}"))));
    record
        .push_summary(RollingSummary::new("Ada planned a trip to Oslo.", 0, 3))
        .unwrap();

    let dump = context::inspect(&config, &record).await.unwrap();
    let roles: Vec<Role> = dump.view.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::System, Role::User, Role::User]);
    assert!(dump.view[1].content.contains("Ada planned a trip to Oslo."));
    assert_eq!(dump.view[3].content, "m5");
    assert_eq!(dump.report.blocks_total, 4);
    assert_eq!(dump.report.blocks_dropped, 0);
    assert_eq!(dump.report.budget, config.window.capabilities().budget());
}

#[tokio::test]
async fn summaries_sort_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(dir.path()).unwrap();

    let old = SessionRecord::new("old").with_title("Old");
    store.save(&old).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut new = SessionRecord::new("new");
    new.append_messages([Message::user("latest topic")]);
    store.save(&new).await.unwrap();

    let rows = sessions::summaries(&store).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.session_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(rows[0].preview.as_deref(), Some("latest topic"));
}

#[test]
fn rendered_record_lists_messages_and_epochs() {
    let mut record = SessionRecord::new("s").with_title("Demo");
    record.append_messages([
        Message::user("look it up"),
        Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                call_id: "c1".into(),
                tool_name: "memory.recall".into(),
                arguments: json!({"query": "x"}),
            }],
        ),
        Message::tool_result("c1", "memory.recall", "nothing"),
        Message::assistant("found nothing"),
    ]);
    record
        .push_summary(RollingSummary::new("idle chatter", 0, 2).low_information(true))
        .unwrap();

    let text = sessions::render_record(&record);
    assert!(text.starts_with("Session s (Demo)"));
    assert!(text.contains("calls [memory.recall]"));
    assert!(text.contains("(c1) nothing"));
    assert!(text.contains("0..=2 (low information): idle chatter"));
}
