//! Streaming transport used by the notification session.
//!
//! The session only needs three things from a transport: send a text
//! frame, receive the next fragment, and close. [`WsTransport`] provides
//! them over a WebSocket; tests substitute scripted transports.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

/// Transport-level failures. All of them end the current session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection or the WebSocket handshake failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] Box<tungstenite::Error>),

    /// Reading from the connection failed.
    #[error("receive failed: {0}")]
    Receive(#[source] Box<tungstenite::Error>),

    /// Lower-level I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the transport delivered on one receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Part (or all) of a logical message.
    Fragment { data: Vec<u8>, is_final: bool },
    /// The peer closed the connection.
    Closed { reason: Option<String> },
}

impl Inbound {
    /// Convenience constructor for a fragment.
    pub fn fragment(data: impl Into<Vec<u8>>, is_final: bool) -> Self {
        Self::Fragment {
            data: data.into(),
            is_final,
        }
    }
}

/// A connected, bidirectional message stream.
pub trait Transport: Send {
    /// Sends one complete text message.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits for the next fragment or the close signal. No timeout applies.
    fn recv(&mut self) -> impl Future<Output = Result<Inbound, TransportError>> + Send;

    /// Closes the connection, ignoring failures.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens transports to an endpoint.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Connects to the endpoint.
    fn connect(
        &self,
        endpoint: &Url,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

/// Connector for plain `ws://` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a WebSocket connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, endpoint: &Url) -> Result<WsTransport, TransportError> {
        let (stream, response) =
            connect_async(endpoint.as_str())
                .await
                .map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source: Box::new(e),
                })?;
        debug!(endpoint = %endpoint, status = %response.status(), "websocket handshake complete");
        Ok(WsTransport { stream })
    }
}

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// Text and binary messages arrive already reassembled by the library and
/// are delivered as single final fragments; ping and pong are answered
/// internally and skipped here.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }

    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Ok(Inbound::Closed { reason: None });
            };

            match message {
                Ok(Message::Text(text)) => {
                    return Ok(Inbound::fragment(text.as_str().as_bytes(), true));
                }
                Ok(Message::Binary(bytes)) => return Ok(Inbound::fragment(bytes.to_vec(), true)),
                Ok(Message::Frame(frame)) => {
                    return Ok(Inbound::fragment(
                        frame.payload().to_vec(),
                        frame.header().is_final,
                    ));
                }
                Ok(Message::Close(frame)) => {
                    let reason = frame.map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()));
                    return Ok(Inbound::Closed { reason });
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    trace!("control message skipped");
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(Inbound::Closed { reason: None });
                }
                Err(e) => return Err(TransportError::Receive(Box::new(e))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close failed");
        }
    }
}
