mod cli;
mod commands;
mod config;
mod output;
mod setup;

use anyhow::Result;
use atodo_storage::paths;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log to a daily rolling file in the data directory. Stdout stays reserved
/// for the conversation.
fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::ensure_logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "atodo.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = match init_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            None
        }
    };
    let config = config::CliConfig::load();

    match &cli.command {
        Commands::Graph { dot } => commands::graph::run(*dot),
        Commands::Memory { partition } => {
            let store = setup::open_store(&cli, &config)?;
            let assistant_config = setup::assistant_config(&cli, &config);
            commands::memory::run(store.as_ref(), &assistant_config, (*partition).into())
        }
        Commands::Chat { conversation } => {
            let assistant = setup::build_assistant(&cli, &config)?;
            commands::chat::run(&assistant, conversation).await
        }
        Commands::Simulate { conversation } => {
            let assistant = setup::build_assistant(&cli, &config)?;
            commands::simulate::run(&assistant, conversation).await
        }
    }
}
