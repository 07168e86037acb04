//! Notification session, reconnect supervisor, sinks and CLI
//!
//! This crate provides the `dp5watch` command-line interface and the
//! library pieces it is built from:
//!
//! - [`transport`]: WebSocket connector behind the [`Transport`] seam
//! - [`session`]: one connect, negotiate, subscribe and receive cycle
//! - [`supervisor`]: restarts sessions forever, one at a time
//! - [`sink`]: where recognized events go

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod signals;
pub mod sink;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use session::{NotificationSession, SessionConfig, SessionReport, SessionState};
pub use signals::{ShutdownHandle, SignalHandler};
pub use sink::{ChannelSink, ConsoleSink, EventSink, OutputFormat};
pub use supervisor::{ReconnectPolicy, Supervisor, SupervisorState};
pub use transport::{Connector, Inbound, Transport, TransportError, WsConnector, WsTransport};
