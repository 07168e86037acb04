//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding inbound frames.
///
/// Encoding never fails; decoding is only used for diagnostics, so none of
/// these ever end a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Nothing but heart-beat newlines.
    #[error("empty frame")]
    EmptyFrame,

    /// The blank line separating headers from the body is missing.
    #[error("frame has no header terminator")]
    MissingHeaderTerminator,

    /// A header line without a `:` separator.
    #[error("malformed header line: {line:?}")]
    MalformedHeader { line: String },
}
