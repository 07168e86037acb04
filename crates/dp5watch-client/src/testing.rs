//! Scripted transports for session and supervisor tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::transport::{Connector, Inbound, Transport, TransportError};

/// One scripted receive result.
pub enum Step {
    Deliver(Inbound),
    Fail(io::ErrorKind),
}

impl Step {
    pub fn text(text: &str) -> Self {
        Self::Deliver(Inbound::fragment(text, true))
    }

    pub fn part(text: &str) -> Self {
        Self::Deliver(Inbound::fragment(text, false))
    }

    pub fn bytes(data: &[u8], is_final: bool) -> Self {
        Self::Deliver(Inbound::fragment(data, is_final))
    }

    pub fn close() -> Self {
        Self::Deliver(Inbound::Closed {
            reason: Some("1000 bye".to_string()),
        })
    }
}

/// What one connection attempt does.
pub enum Script {
    Refuse,
    Accept(Vec<Step>),
}

/// Counters shared by every transport a connector hands out.
#[derive(Debug, Default)]
pub struct Probe {
    pub sent: Mutex<Vec<String>>,
    pub connects: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
    pub closed_by_client: AtomicUsize,
}

impl Probe {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }
}

/// Hands out scripted transports in order. Once the scripts run out every
/// further attempt is refused.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    pub probe: Arc<Probe>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            probe: Arc::new(Probe::default()),
        }
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _endpoint: &Url) -> Result<ScriptedTransport, TransportError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Accept(steps)) => {
                let open = self.probe.open.fetch_add(1, Ordering::SeqCst) + 1;
                self.probe.max_open.fetch_max(open, Ordering::SeqCst);
                Ok(ScriptedTransport {
                    steps: steps.into(),
                    probe: self.probe.clone(),
                })
            }
            Some(Script::Refuse) | None => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

/// Replays its steps, then blocks forever like a silent server.
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    probe: Arc<Probe>,
}

impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.probe.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        tokio::task::yield_now().await;
        match self.steps.pop_front() {
            Some(Step::Deliver(inbound)) => Ok(inbound),
            Some(Step::Fail(kind)) => Err(TransportError::Io(io::Error::new(kind, "scripted failure"))),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.probe.closed_by_client.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        self.probe.open.fetch_sub(1, Ordering::SeqCst);
    }
}
