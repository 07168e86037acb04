//! Frame model and text codec.
//!
//! A frame is a command line, zero or more `name:value` header lines, a
//! blank line, the body and a terminating NUL:
//!
//! ```text
//! COMMAND\n
//! name:value\n
//! \n
//! body\0
//! ```
//!
//! Header names and values are written verbatim. Callers must keep `:`,
//! `\n` and `\0` out of them; nothing is escaped.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Negotiation command.
pub const CONNECT: &str = "CONNECT";
/// Subscription command.
pub const SUBSCRIBE: &str = "SUBSCRIBE";
/// Server error frame.
pub const ERROR: &str = "ERROR";
/// Server message frame.
pub const MESSAGE: &str = "MESSAGE";

/// Protocol versions advertised in the negotiation frame.
pub const DEFAULT_ACCEPT_VERSION: &str = "1.0,1.1,2.0";
/// Topic carrying device and scan events.
pub const DEFAULT_DESTINATION: &str = "/topic/events";

const EOL: char = '\n';
const NUL: char = '\0';

/// A single protocol frame.
///
/// Header names are unique; setting an existing name replaces its value in
/// place so the wire order stays the order of first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Builds the negotiation frame.
    pub fn connect(accept_version: impl Into<String>) -> Self {
        Self::new(CONNECT).header("accept-version", accept_version)
    }

    /// Builds the subscription frame.
    pub fn subscribe(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(SUBSCRIBE)
            .header("id", id)
            .header("destination", destination)
    }

    /// Builder: set a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder: set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a header, replacing the value of an existing name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Returns the command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the value of a header.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the body text.
    pub fn body_text(&self) -> &str {
        &self.body
    }

    /// Serializes the frame to wire text.
    pub fn encode(&self) -> String {
        encode_frame(self)
    }

    fn wire_len(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len() + 2)
            .sum();
        self.command.len() + 1 + headers + 1 + self.body.len() + 1
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_frame(self))
    }
}

/// Serializes a frame to its exact wire representation.
pub fn encode_frame(frame: &Frame) -> String {
    let mut out = String::with_capacity(frame.wire_len());
    out.push_str(&frame.command);
    out.push(EOL);
    for (name, value) in &frame.headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push(EOL);
    }
    out.push(EOL);
    out.push_str(&frame.body);
    out.push(NUL);
    out
}

/// Parses an inbound control frame such as `CONNECTED` or `ERROR`.
///
/// Leading heart-beat newlines are skipped, `\r\n` line endings are
/// accepted, and the body stops at the first NUL. When a header repeats,
/// the first value wins.
pub fn decode_frame(input: &str) -> ProtocolResult<Frame> {
    let text = input.trim_start_matches(['\r', '\n']);
    if text.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    let (head_end, body_start) =
        find_blank_line(text).ok_or(ProtocolError::MissingHeaderTerminator)?;

    let mut lines = text[..head_end].lines();
    let command = lines.next().unwrap_or_default();
    let mut frame = Frame::new(command);

    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedHeader {
                line: line.to_string(),
            })?;
        if frame.get_header(name).is_none() {
            frame.headers.push((name.to_string(), value.to_string()));
        }
    }

    let body = &text[body_start..];
    frame.body = body.split(NUL).next().unwrap_or_default().to_string();
    Ok(frame)
}

/// Locates the empty line ending the header block.
///
/// Returns the offset where that line starts and the offset of the first
/// body byte.
fn find_blank_line(text: &str) -> Option<(usize, usize)> {
    let mut line_start = 0;
    for (idx, _) in text.match_indices(EOL) {
        let line = &text[line_start..idx];
        if line.is_empty() || line == "\r" {
            return Some((line_start, idx + 1));
        }
        line_start = idx + 1;
    }
    None
}
