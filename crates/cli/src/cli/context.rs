use pv_domain::config::Config;
use pv_domain::text::truncate_chars;
use pv_domain::tool::Message;
use pv_memory::CoreMemoryBuilder;
use pv_runtime::{assemble_view, build_memory, build_window, chunk_into_blocks, CharHeuristic, WindowReport};
use pv_sessions::{SessionRecord, SessionStorage};
use serde::Serialize;

const LINE_PREVIEW: usize = 100;

#[derive(Debug, Serialize)]
pub struct ContextDump {
    pub session_id: String,
    pub view: Vec<Message>,
    pub report: WindowReport,
}

/// The assembled view for `record` and the window report against the
/// configured fallback budget.
pub async fn inspect(config: &Config, record: &SessionRecord) -> anyhow::Result<ContextDump> {
    let (memory, semantic) = build_memory(config)?;
    let core = CoreMemoryBuilder::new(memory.as_ref(), &config.memory)
        .with_semantic(semantic.as_deref())
        .with_system_prompt(config.agent.system_prompt.clone())
        .build_message()
        .await;
    let view = assemble_view(record, core);

    let budget = config.window.capabilities().budget();
    let sizer = CharHeuristic::from(&config.window);
    let window = build_window(chunk_into_blocks(&view), budget, &sizer);

    Ok(ContextDump {
        session_id: record.session_id.clone(),
        view,
        report: window.report,
    })
}

pub async fn run(config: &Config, session_id: &str, json: bool) -> anyhow::Result<bool> {
    let store = super::sessions::open_store(config)?;
    let Some(record) = store.load(session_id).await? else {
        eprintln!("Session not found: {session_id}");
        return Ok(false);
    };
    let dump = inspect(config, &record).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(true);
    }

    println!("Assembled view for {} ({} messages)", dump.session_id, dump.view.len());
    for msg in &dump.view {
        println!("  {}", describe(msg));
    }
    let r = dump.report;
    println!(
        "\nWindow: {}/{} blocks kept, {} dropped, size {} of budget {}{}",
        r.blocks_kept,
        r.blocks_total,
        r.blocks_dropped,
        r.size,
        r.budget,
        if r.over_budget() { " (system content over budget)" } else { "" },
    );
    Ok(true)
}

/// One-line description of a message.
pub fn describe(msg: &Message) -> String {
    let (text, _) = truncate_chars(&msg.content.replace('\n', " "), LINE_PREVIEW, "…");
    if msg.has_tool_calls() {
        let names: Vec<&str> = msg.tool_calls.iter().map(|c| c.tool_name.as_str()).collect();
        format!("{:<9} calls [{}] {text}", msg.role.as_str(), names.join(", "))
    } else if let Some(id) = &msg.tool_call_id {
        format!("{:<9} ({id}) {text}", msg.role.as_str())
    } else {
        format!("{:<9} {text}", msg.role.as_str())
    }
}
