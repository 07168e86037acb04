//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dp5watch_core::TracingOutputFormat;

use crate::config::ClientConfig;
use crate::sink::OutputFormat;

/// dp5watch - Live notifications from a DP5 instrument server
#[derive(Debug, Parser)]
#[command(name = "dp5watch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DP5WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format on stderr (pretty, compact, json)
    #[arg(long, env = "DP5WATCH_LOG_FORMAT")]
    pub log_format: Option<TracingOutputFormat>,

    // --- Connection flags ---
    /// Server host
    #[arg(long, env = "DP5WATCH_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "DP5WATCH_PORT")]
    pub port: Option<u16>,

    /// WebSocket path
    #[arg(long, env = "DP5WATCH_PATH")]
    pub path: Option<String>,

    // --- Output format flags ---
    /// Print event payloads as JSON lines instead of raw messages
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Applies flags on top of file values.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if self.debug {
            config.debug = true;
        }
        if let Some(ref host) = self.host {
            config.endpoint.host = host.clone();
        }
        if let Some(port) = self.port {
            config.endpoint.port = port;
        }
        if let Some(ref path) = self.path {
            config.endpoint.path = path.clone();
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the event stream (default)
    Watch,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_watch() {
        let cli = Cli::try_parse_from(["dp5watch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "dp5watch", "--host", "dp5.lab", "--port", "9100", "--path", "/ws", "--json", "-v",
            "watch",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Watch)));

        let mut config = ClientConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.debug);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "ws://dp5.lab:9100/ws"
        );
    }

    #[test]
    fn absent_flags_keep_config() {
        let cli = Cli::try_parse_from(["dp5watch", "config", "dump"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Dump
            })
        ));

        let mut config = ClientConfig::default();
        config.endpoint.port = 1234;
        cli.apply_overrides(&mut config);
        assert_eq!(config.endpoint.port, 1234);
        assert_eq!(config.output.format, OutputFormat::Raw);
    }

    #[test]
    fn log_format_parses() {
        let cli = Cli::try_parse_from(["dp5watch", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(TracingOutputFormat::Json));
        assert!(Cli::try_parse_from(["dp5watch", "--log-format", "xml"]).is_err());
    }
}
