//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/dp5watch/config.toml` by default. Every key is optional;
//! missing keys take the values the DP5 server expects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dp5watch_protocol::{DEFAULT_ACCEPT_VERSION, DEFAULT_DESTINATION, MAX_MESSAGE_SIZE};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::SessionConfig;
use crate::sink::OutputFormat;
use crate::supervisor::ReconnectPolicy;

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the dp5watch client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Where the event stream lives.
    pub endpoint: EndpointSettings,

    /// Handshake and subscription settings.
    pub subscription: SubscriptionSettings,

    /// Delay between sessions.
    pub reconnect: ReconnectSettings,

    /// Console output settings.
    pub output: OutputSettings,
}

/// Event stream endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Server host name or address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// WebSocket path, with or without a leading slash.
    pub path: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8777,
            path: "dp5-websocket".to_string(),
        }
    }
}

/// Handshake settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionSettings {
    /// Versions advertised in the CONNECT frame.
    pub accept_version: String,

    /// Topic to subscribe to.
    pub destination: String,

    /// Pause between CONNECT and SUBSCRIBE, in milliseconds.
    pub handshake_grace_ms: u64,

    /// Largest reassembled message kept, in bytes. Bigger ones are dropped.
    pub max_message_size: usize,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            accept_version: DEFAULT_ACCEPT_VERSION.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            handshake_grace_ms: 1000,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Reconnect backoff. Zero initial delay means reconnect immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

/// Console output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// `raw` prints messages as received, `json` prints the payload.
    pub format: OutputFormat,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dp5watch")
    }

    /// Builds `ws://host:port/path`.
    pub fn endpoint_url(&self) -> Result<Url, String> {
        let EndpointSettings { host, port, path } = &self.endpoint;
        let path = path.trim_start_matches('/');
        Url::parse(&format!("ws://{host}:{port}/{path}"))
            .map_err(|e| format!("invalid endpoint {host}:{port}/{path}: {e}"))
    }

    /// Checks values that parse but cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.host.trim().is_empty() {
            return Err("endpoint.host must not be empty".to_string());
        }
        if self.endpoint.port == 0 {
            return Err("endpoint.port must not be 0".to_string());
        }
        self.endpoint_url()?;
        if self.subscription.destination.trim().is_empty() {
            return Err("subscription.destination must not be empty".to_string());
        }
        if self.subscription.max_message_size == 0 {
            return Err("subscription.max_message_size must not be 0".to_string());
        }
        if self.reconnect.multiplier < 1.0 {
            return Err("reconnect.multiplier must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.reconnect.jitter) {
            return Err("reconnect.jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> Result<SessionConfig, String> {
        Ok(SessionConfig::new(self.endpoint_url()?)
            .with_accept_version(self.subscription.accept_version.as_str())
            .with_destination(self.subscription.destination.as_str())
            .with_handshake_grace(Duration::from_millis(self.subscription.handshake_grace_ms))
            .with_max_message_size(self.subscription.max_message_size))
    }

    /// Reconnect policy derived from this configuration.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::immediate()
            .with_backoff(
                Duration::from_millis(self.reconnect.initial_delay_ms),
                Duration::from_millis(self.reconnect.max_delay_ms),
                self.reconnect.multiplier,
            )
            .with_jitter(self.reconnect.jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_server() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "ws://localhost:8777/dp5-websocket"
        );
        assert_eq!(config.subscription.accept_version, "1.0,1.1,2.0");
        assert_eq!(config.subscription.destination, "/topic/events");
        assert_eq!(config.output.format, OutputFormat::Raw);
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::immediate());
        config.validate().unwrap();
    }

    #[test]
    fn empty_file_is_default() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml_content = r#"
[endpoint]
host = "dp5.lab.local"

[subscription]
handshake_grace_ms = 250

[output]
format = "json"
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.endpoint.host, "dp5.lab.local");
        assert_eq!(config.endpoint.port, 8777);
        assert_eq!(config.output.format, OutputFormat::Json);

        let session = config.session_config().unwrap();
        assert_eq!(session.endpoint.as_str(), "ws://dp5.lab.local:8777/dp5-websocket");
        assert_eq!(session.handshake_grace, Duration::from_millis(250));
        assert_eq!(session.destination, "/topic/events");
        assert_eq!(session.max_message_size, MAX_MESSAGE_SIZE);
    }

    #[test]
    fn message_size_limit_reaches_session() {
        let toml_content = "[subscription]\nmax_message_size = 4096\n";
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.session_config().unwrap().max_message_size, 4096);

        let mut config = ClientConfig::default();
        config.subscription.max_message_size = 0;
        assert!(config.validate().unwrap_err().contains("max_message_size"));
    }

    #[test]
    fn leading_slash_in_path_is_accepted() {
        let mut config = ClientConfig::default();
        config.endpoint.path = "/custom/ws".to_string();
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "ws://localhost:8777/custom/ws"
        );
    }

    #[test]
    fn reconnect_section_builds_policy() {
        let toml_content = r#"
[reconnect]
initial_delay_ms = 500
max_delay_ms = 4000
multiplier = 3.0
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        let policy = config.reconnect_policy();
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1500));
        assert_eq!(policy.delay(5), Duration::from_millis(4000));
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = ClientConfig::default();
        config.endpoint.port = 0;
        assert!(config.validate().unwrap_err().contains("port"));

        let mut config = ClientConfig::default();
        config.endpoint.host = " ".to_string();
        assert!(config.validate().unwrap_err().contains("host"));

        let mut config = ClientConfig::default();
        config.reconnect.jitter = 1.5;
        assert!(config.validate().unwrap_err().contains("jitter"));

        let mut config = ClientConfig::default();
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().unwrap_err().contains("multiplier"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug = true\n[endpoint]\nport = 9000").unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.endpoint.port, 9000);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[endpoint]\nport = \"high\"").unwrap();

        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(err.starts_with("failed to parse config"));
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.starts_with("failed to read config"));
    }

    #[test]
    fn dump_round_trips_through_toml() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[endpoint]"));
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("dp5watch/config.toml"));
    }
}
