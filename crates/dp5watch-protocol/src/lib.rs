//! Text sub-protocol spoken on the device event channel.
//!
//! The client sends two frames and then only listens:
//!
//! ```text
//! CONNECT
//! accept-version:1.0,1.1,2.0
//!
//! ^@
//! SUBSCRIBE
//! id:sub-6f1c...
//! destination:/topic/events
//!
//! ^@
//! ```
//!
//! Everything arriving afterwards goes through the [`Reassembler`] and the
//! event extractor ([`extract_event`]), which keeps only payloads whose
//! `notificationType` is on the allow-list.
//!
//! # Example
//!
//! ```rust
//! use dp5watch_protocol::{Extraction, Frame, Reassembled, Reassembler, extract_event};
//!
//! let wire = Frame::subscribe("x", "/topic/events").encode();
//! assert_eq!(wire, "SUBSCRIBE\nid:x\ndestination:/topic/events\n\n\0");
//!
//! let mut reassembler = Reassembler::new();
//! assert!(matches!(reassembler.feed(b"{\"notificationType\":", false), Reassembled::Pending));
//! let Reassembled::Complete(text) = reassembler.feed(b"\"SCAN_MILESTONE\"}", true) else {
//!     panic!("message should be complete");
//! };
//! assert!(matches!(extract_event(&text), Extraction::Event(_)));
//! ```

mod error;
mod extract;
mod frame;
mod reassembly;

pub use error::{ProtocolError, ProtocolResult};
pub use extract::{Extraction, IgnoreReason, extract_event};
pub use frame::{
    CONNECT, DEFAULT_ACCEPT_VERSION, DEFAULT_DESTINATION, ERROR, Frame, MESSAGE, SUBSCRIBE,
    decode_frame, encode_frame,
};
pub use reassembly::{Discard, MAX_MESSAGE_SIZE, Reassembled, Reassembler};
