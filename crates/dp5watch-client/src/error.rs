//! Client error types.

use std::fmt;

use crate::transport::TransportError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
///
/// Within a session only [`ClientError::Transport`] is ever produced; content
/// problems are absorbed by the receive loop.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Transport failure (connect, send or receive).
    Transport(TransportError),
    /// Tracing could not be initialized.
    Logging(dp5watch_core::TracingError),
}

impl ClientError {
    /// Returns true if the error came from the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Logging(err) => write!(f, "logging setup failed: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<dp5watch_core::TracingError> for ClientError {
    fn from(err: dp5watch_core::TracingError) -> Self {
        Self::Logging(err)
    }
}
