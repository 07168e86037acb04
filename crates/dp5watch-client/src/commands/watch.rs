//! The default command: stream events until interrupted.

use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::signals::SignalHandler;
use crate::sink::ConsoleSink;
use crate::supervisor::Supervisor;
use crate::transport::WsConnector;

/// Connects to the configured endpoint and prints every recognized event.
///
/// Reconnects forever; returns once SIGINT or SIGTERM is received.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;
    let session_config = config.session_config().map_err(ClientError::Config)?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let supervisor = Supervisor::new(
        WsConnector::new(),
        ConsoleSink::stdout(config.output.format),
        session_config,
        config.reconnect_policy(),
    );
    let state = supervisor.state();

    supervisor.run(signals.shutdown_handle()).await;

    let state = state.read().await;
    info!(
        sessions = state.sessions_started,
        events = state.events,
        "watch finished"
    );
    Ok(())
}
