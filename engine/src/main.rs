// DeepDive research engine
// Main entry point for the deepdive binary

use clap::Parser;
use deepdive_engine::cli::{Cli, Command, KeyAction};
use deepdive_engine::config::Config;
use deepdive_engine::handlers::{
    handle_delete, handle_depths, handle_history, handle_key_set, handle_memory,
    handle_providers, handle_research, handle_show, OutputFormat,
};
use deepdive_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config level; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::debug!(
        "DeepDive v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Research(args) => {
            tracing::info!("Research query: {}", args.query);
            handle_research(args, &config, format).await
        }

        Command::History { limit } => handle_history(limit, &config, format).await,

        Command::Show { id } => handle_show(id, &config, format).await,

        Command::Delete { id } => handle_delete(id, &config, format).await,

        Command::Memory { action } => {
            tracing::debug!("Memory management: {:?}", action);
            handle_memory(action, &config, format).await
        }

        Command::Providers => handle_providers(&config, format).await,

        Command::Depths => handle_depths(format),

        Command::Key { action } => match action {
            KeyAction::Set { provider } => handle_key_set(provider, format),
        },
    }
}
