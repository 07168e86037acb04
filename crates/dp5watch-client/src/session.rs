//! One connect-negotiate-subscribe-receive cycle.
//!
//! ```text
//! CONNECTING -> NEGOTIATING -> SUBSCRIBED -> RECEIVING -> CLOSED
//!      \             \                           \
//!       +-------------+---------------------------+-> FAILED
//! ```
//!
//! The handshake is fire-and-forget: neither the `CONNECTED` reply nor any
//! receipt is awaited before the receive loop starts. Control frames that
//! arrive later are logged and otherwise ignored.

use std::future::Future;
use std::time::Duration;

use dp5watch_protocol::{
    DEFAULT_ACCEPT_VERSION, DEFAULT_DESTINATION, Discard, ERROR, Extraction, Frame,
    IgnoreReason, MAX_MESSAGE_SIZE, Reassembled, Reassembler, decode_frame, extract_event,
};
use tracing::{debug, info, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::error::ClientResult;
use crate::signals::ShutdownHandle;
use crate::sink::EventSink;
use crate::transport::{Connector, Inbound, Transport};

/// Settings for a notification session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Event stream endpoint.
    pub endpoint: Url,
    /// Versions advertised in the negotiation frame.
    pub accept_version: String,
    /// Topic to subscribe to.
    pub destination: String,
    /// Pause between negotiation and subscription.
    pub handshake_grace: Duration,
    /// Largest reassembled message accepted.
    pub max_message_size: usize,
}

impl SessionConfig {
    /// Creates a config with protocol defaults for the given endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            accept_version: DEFAULT_ACCEPT_VERSION.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            handshake_grace: Duration::from_secs(1),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Builder: set the negotiation/subscription pause.
    pub fn with_handshake_grace(mut self, grace: Duration) -> Self {
        self.handshake_grace = grace;
        self
    }

    /// Builder: set the subscription topic.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Builder: set the advertised protocol versions.
    pub fn with_accept_version(mut self, versions: impl Into<String>) -> Self {
        self.accept_version = versions.into();
        self
    }

    /// Builder: set the reassembly size limit.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Negotiating,
    Subscribed,
    Receiving,
    Closed,
    Failed,
}

impl SessionState {
    /// Returns true for `Closed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Summary of a session that ended without a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Identifier sent in the subscription frame.
    pub subscription_id: String,
    /// Complete messages received.
    pub messages: u64,
    /// Events handed to the sink.
    pub events: u64,
    /// Messages that produced no event.
    pub ignored: u64,
    /// Close reason reported by the peer.
    pub close_reason: Option<String>,
    /// True if the session stopped because shutdown was requested.
    pub interrupted: bool,
}

/// A single connection attempt. Consumed by [`NotificationSession::run`];
/// reconnecting means starting a new session.
pub struct NotificationSession {
    config: SessionConfig,
    state: SessionState,
    reassembler: Reassembler,
    report: SessionReport,
    shutdown: Option<ShutdownHandle>,
}

impl NotificationSession {
    /// Creates a session with a fresh subscription identifier.
    pub fn new(config: SessionConfig) -> Self {
        let subscription_id = format!("sub-{}", Uuid::new_v4());
        Self::with_subscription_id(config, subscription_id)
    }

    /// Creates a session with a caller-chosen subscription identifier.
    pub fn with_subscription_id(config: SessionConfig, subscription_id: impl Into<String>) -> Self {
        let reassembler = Reassembler::with_max_len(config.max_message_size);
        Self {
            config,
            state: SessionState::Connecting,
            reassembler,
            report: SessionReport {
                subscription_id: subscription_id.into(),
                ..SessionReport::default()
            },
            shutdown: None,
        }
    }

    /// Builder: stop promptly, even mid-receive, when shutdown is triggered.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Returns the subscription identifier.
    pub fn subscription_id(&self) -> &str {
        &self.report.subscription_id
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion.
    ///
    /// Returns the report when the peer closes the connection or shutdown is
    /// requested, and the transport error when the session fails. The
    /// transport is released before this returns.
    pub async fn run<C, S>(mut self, connector: &C, sink: &mut S) -> ClientResult<SessionReport>
    where
        C: Connector,
        S: EventSink,
    {
        match self.drive(connector, sink).await {
            Ok(()) => {
                self.transition(SessionState::Closed);
                Ok(self.report)
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn drive<C, S>(&mut self, connector: &C, sink: &mut S) -> ClientResult<()>
    where
        C: Connector,
        S: EventSink,
    {
        self.transition(SessionState::Connecting);
        let Some(connected) = self.until_shutdown(connector.connect(&self.config.endpoint)).await
        else {
            return Ok(());
        };
        let mut transport = connected?;
        info!(endpoint = %self.config.endpoint, "connected to event stream");

        self.transition(SessionState::Negotiating);
        let connect = Frame::connect(self.config.accept_version.as_str());
        transport.send_text(connect.encode()).await?;

        if !self.config.handshake_grace.is_zero()
            && self
                .until_shutdown(tokio::time::sleep(self.config.handshake_grace))
                .await
                .is_none()
        {
            transport.close().await;
            return Ok(());
        }

        let subscribe = Frame::subscribe(
            self.report.subscription_id.as_str(),
            self.config.destination.as_str(),
        );
        transport.send_text(subscribe.encode()).await?;
        self.transition(SessionState::Subscribed);
        debug!(
            subscription_id = %self.report.subscription_id,
            destination = %self.config.destination,
            "subscription sent"
        );

        self.transition(SessionState::Receiving);
        self.receive_loop(&mut transport, sink).await
    }

    async fn receive_loop<T, S>(&mut self, transport: &mut T, sink: &mut S) -> ClientResult<()>
    where
        T: Transport,
        S: EventSink,
    {
        loop {
            let Some(received) = self.until_shutdown(transport.recv()).await else {
                transport.close().await;
                return Ok(());
            };

            match received? {
                Inbound::Closed { reason } => {
                    let dropped = self.reassembler.close();
                    if dropped > 0 {
                        debug!(bytes = dropped, "partial message dropped on close");
                    }
                    info!(reason = ?reason, "event stream closed by server");
                    self.report.close_reason = reason;
                    return Ok(());
                }
                Inbound::Fragment { data, is_final } => {
                    match self.reassembler.feed(&data, is_final) {
                        Reassembled::Pending => {}
                        Reassembled::Complete(text) => self.handle_message(&text, sink),
                        Reassembled::Discarded(discard) => self.handle_discard(discard),
                    }
                }
            }
        }
    }

    fn handle_message<S: EventSink>(&mut self, text: &str, sink: &mut S) {
        self.report.messages += 1;
        match extract_event(text) {
            Extraction::Event(record) => {
                self.report.events += 1;
                debug!(
                    kind = %record.notification_type,
                    category = record.notification_type.category(),
                    "event received"
                );
                sink.dispatch(&record);
            }
            Extraction::Ignored(reason) => {
                self.report.ignored += 1;
                log_ignored(text, &reason);
            }
        }
    }

    fn handle_discard(&mut self, discard: Discard) {
        self.report.messages += 1;
        self.report.ignored += 1;
        match discard {
            Discard::InvalidUtf8(e) => debug!(error = %e, "message is not valid UTF-8"),
            Discard::Oversized { size, max } => warn!(size, max, "message too large, dropped"),
        }
    }

    /// Awaits `fut` unless shutdown fires first.
    async fn until_shutdown<F: Future>(&self, fut: F) -> Option<F::Output> {
        let Some(shutdown) = &self.shutdown else {
            return Some(fut.await);
        };
        if shutdown.is_shutdown() {
            return None;
        }
        let stopped = shutdown.wait();
        tokio::select! {
            output = fut => Some(output),
            () = stopped.wait() => {
                debug!(state = ?self.state, "session interrupted by shutdown");
                None
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next == SessionState::Closed
            && self.shutdown.as_ref().is_some_and(ShutdownHandle::is_shutdown)
        {
            self.report.interrupted = true;
        }
        if next.is_terminal() {
            debug!(from = ?self.state, to = ?next, "session finished");
        } else {
            trace!(from = ?self.state, to = ?next, "session state");
        }
        self.state = next;
    }
}

fn log_ignored(text: &str, reason: &IgnoreReason) {
    match reason {
        IgnoreReason::NoJson => match decode_frame(text) {
            Ok(frame) if frame.command() == ERROR => warn!(
                message = frame.get_header("message").unwrap_or_default(),
                body = frame.body_text(),
                "server sent an ERROR frame"
            ),
            Ok(frame) => debug!(command = frame.command(), "control frame ignored"),
            Err(e) => trace!(error = %e, "non-frame text ignored"),
        },
        IgnoreReason::Malformed(e) => debug!(error = %e, "malformed JSON payload ignored"),
        IgnoreReason::MissingDiscriminator => trace!("payload without notificationType ignored"),
        IgnoreReason::UnknownType(kind) => trace!(kind = %kind, "unlisted notification type ignored"),
    }
}
