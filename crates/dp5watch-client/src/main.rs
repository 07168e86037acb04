//! dp5watch CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use dp5watch_core::{TracingConfig, init_tracing};

use dp5watch_client::cli::{Cli, Command, ConfigAction};
use dp5watch_client::commands;
use dp5watch_client::config::ClientConfig;
use dp5watch_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let source = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = if cli.config.is_some() {
        ClientConfig::load_from(&source).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };
    cli.apply_overrides(&mut config);

    // Initialize tracing
    let mut tracing_config = if config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::watcher()
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    init_tracing(tracing_config)?;

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &source),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&source),
        },
        Some(Command::Watch) | None => commands::watch::run(&config).await,
    }
}
