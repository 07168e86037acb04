//! Reassembly of transport fragments into complete text messages.
//!
//! The transport may split one logical message over any number of
//! fragments. Bytes are only decoded once the final fragment arrives, so a
//! multi-byte UTF-8 sequence split across fragments decodes correctly.

use std::mem;
use std::string::FromUtf8Error;

/// Largest message accepted before the partial buffer is dropped (64 MiB,
/// the same ceiling the WebSocket layer applies to a single message).
pub const MAX_MESSAGE_SIZE: usize = 64 << 20;

/// Result of feeding one fragment.
#[derive(Debug)]
pub enum Reassembled {
    /// More fragments are needed.
    Pending,
    /// The final fragment arrived and the message decoded as UTF-8.
    Complete(String),
    /// The final fragment arrived but the message is unusable.
    Discarded(Discard),
}

/// Why a completed message was thrown away. Never fatal to a session.
#[derive(Debug)]
pub enum Discard {
    /// The accumulated bytes are not valid UTF-8.
    InvalidUtf8(FromUtf8Error),
    /// The message grew past the size limit.
    Oversized { size: usize, max: usize },
}

/// Accumulates fragments of one logical message at a time.
#[derive(Debug)]
pub struct Reassembler {
    buffer: Vec<u8>,
    max_len: usize,
    /// Total size seen once the limit is exceeded; bytes are no longer kept.
    overflow: Option<usize>,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Creates a reassembler with the default size limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_MESSAGE_SIZE)
    }

    /// Creates a reassembler with a custom size limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
            overflow: None,
        }
    }

    /// Appends a fragment; on the final fragment the message is returned and
    /// the buffer resets for the next one.
    pub fn feed(&mut self, fragment: &[u8], is_final: bool) -> Reassembled {
        match self.overflow.as_mut() {
            Some(seen) => *seen += fragment.len(),
            None if self.buffer.len() + fragment.len() > self.max_len => {
                self.overflow = Some(self.buffer.len() + fragment.len());
                self.buffer.clear();
            }
            None => self.buffer.extend_from_slice(fragment),
        }

        if !is_final {
            return Reassembled::Pending;
        }

        if let Some(size) = self.overflow.take() {
            return Reassembled::Discarded(Discard::Oversized {
                size,
                max: self.max_len,
            });
        }

        match String::from_utf8(mem::take(&mut self.buffer)) {
            Ok(text) => Reassembled::Complete(text),
            Err(err) => Reassembled::Discarded(Discard::InvalidUtf8(err)),
        }
    }

    /// Abandons the message in progress, returning how many bytes it had.
    pub fn close(&mut self) -> usize {
        let dropped = self.pending_len();
        self.buffer.clear();
        self.overflow = None;
        dropped
    }

    /// Bytes received so far for the message in progress.
    pub fn pending_len(&self) -> usize {
        self.overflow.unwrap_or(self.buffer.len())
    }

    /// Returns true when no message is in progress.
    pub fn is_idle(&self) -> bool {
        self.pending_len() == 0
    }
}
