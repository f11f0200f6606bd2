use clap::Parser;
use tracing_subscriber::EnvFilter;

use pv_cli::cli::{self, Cli, Command, ConfigCommand, MemoryCommand, SessionsCommand};
use pv_domain::config::{LogFormat, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = cli::load_config()?;
    init_tracing(&config.observability);

    let ok = match cli.command {
        Command::Config(ConfigCommand::Validate) => cli::config::validate(&config, &config_path),
        Command::Config(ConfigCommand::Show) => {
            cli::config::show(&config)?;
            true
        }
        Command::Sessions(SessionsCommand::List { json }) => {
            cli::sessions::list(&config, json).await?;
            true
        }
        Command::Sessions(SessionsCommand::Show { session_id, json }) => {
            cli::sessions::show(&config, &session_id, json).await?
        }
        Command::Sessions(SessionsCommand::Delete { session_id }) => {
            cli::sessions::delete(&config, &session_id).await?
        }
        Command::Context { session_id, json } => cli::context::run(&config, &session_id, json).await?,
        Command::Memory(MemoryCommand::Get { category, key }) => {
            cli::memory::get(&config, &category, &key).await?
        }
        Command::Memory(MemoryCommand::Search { query, category }) => {
            cli::memory::search(&config, &query, category.as_deref()).await?;
            true
        }
        Command::Memory(MemoryCommand::List { category }) => {
            cli::memory::list(&config, &category).await?;
            true
        }
        Command::Version => {
            println!("palaver {}", env!("CARGO_PKG_VERSION"));
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG`
/// overrides the configured filter.
fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&obs.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match obs.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.compact().init(),
    }
}
