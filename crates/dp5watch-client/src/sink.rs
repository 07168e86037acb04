//! Consumers of extracted events.

use std::io::{self, Write};

use dp5watch_core::EventRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receives every recognized event, in arrival order.
pub trait EventSink: Send {
    /// Handles one event. Must not block for long: the receive loop waits.
    fn dispatch(&mut self, record: &EventRecord);
}

/// How events are written to the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The message text exactly as received.
    #[default]
    Raw,
    /// The parsed payload as one compact JSON line.
    Json,
}

/// Writes events to a writer, stdout by default.
pub struct ConsoleSink<W = io::Stdout> {
    writer: W,
    format: OutputFormat,
}

impl ConsoleSink<io::Stdout> {
    /// Creates a sink printing to stdout.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &EventRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Raw => writeln!(self.writer, "{}", record.raw)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, &record.payload)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn dispatch(&mut self, record: &EventRecord) {
        if let Err(e) = self.write_record(record) {
            warn!(error = %e, kind = %record.notification_type, "failed to write event");
        }
    }
}

/// Forwards events to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EventRecord>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events go to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn dispatch(&mut self, record: &EventRecord) {
        if self.tx.send(record.clone()).is_err() {
            debug!(kind = %record.notification_type, "event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp5watch_core::NotificationType;

    fn record() -> EventRecord {
        EventRecord::new(
            NotificationType::LinearNewBarcode,
            serde_json::json!({"notificationType": "LINEAR_NEW_BARCODE", "barcode": "FR0001"}),
            "MESSAGE\n\n{\"notificationType\":\"LINEAR_NEW_BARCODE\",\"barcode\":\"FR0001\"}",
        )
    }

    #[test]
    fn raw_output_prints_message_text() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Raw);
        sink.dispatch(&record());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "MESSAGE\n\n{\"notificationType\":\"LINEAR_NEW_BARCODE\",\"barcode\":\"FR0001\"}\n"
        );
    }

    #[test]
    fn json_output_prints_payload_line() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Json);
        sink.dispatch(&record());
        sink.dispatch(&record());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"barcode":"FR0001","notificationType":"LINEAR_NEW_BARCODE"}"#
        );
    }

    #[test]
    fn output_format_names() {
        assert_eq!(serde_json::to_string(&OutputFormat::Raw).unwrap(), "\"raw\"");
        let json: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(json, OutputFormat::Json);
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (mut sink, mut rx) = ChannelSink::new();
        sink.dispatch(&record());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.notification_type, NotificationType::LinearNewBarcode);

        drop(rx);
        sink.dispatch(&record());
    }
}
