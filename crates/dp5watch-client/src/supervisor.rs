//! Reconnect supervisor.
//!
//! Runs notification sessions one after another for the lifetime of the
//! process:
//! - At most one session (and one transport) exists at any time
//! - Every session end, clean or failed, starts exactly one new session
//! - Optional exponential backoff between consecutive failures
//! - Stops only when shutdown is requested

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::session::{NotificationSession, SessionConfig};
use crate::signals::ShutdownHandle;
use crate::sink::EventSink;
use crate::transport::Connector;

/// Delay policy between sessions.
///
/// The default reconnects immediately, with no delay and no attempt limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay after the first consecutive failure.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
    /// Growth factor per further failure.
    pub multiplier: f64,
    /// Random spread applied to the delay (fraction 0.0-1.0).
    pub jitter_fraction: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl ReconnectPolicy {
    /// Reconnect without waiting.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_fraction: 0.0,
        }
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self.multiplier = multiplier;
        self
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Calculates the delay before the next session.
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64();
        let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
        let delay = (base * self.multiplier.powi(exponent)).min(self.max_delay.as_secs_f64());
        let jitter = rand_jitter(delay * self.jitter_fraction);

        Duration::from_secs_f64((delay + jitter).max(0.0))
    }
}

/// Pseudo-random value in [-range, range] from the clock's sub-second nanos.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    if range <= 0.0 {
        return 0.0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = f64::from(nanos) / 1_000_000_000.0;
    (fraction * 2.0 - 1.0) * range
}

/// Supervisor bookkeeping.
#[derive(Debug, Default)]
pub struct SupervisorState {
    /// Sessions started so far.
    pub sessions_started: u64,
    /// Failed sessions since the last clean one.
    pub consecutive_failures: u32,
    /// Events dispatched across all sessions.
    pub events: u64,
    /// Last failure message.
    pub last_error: Option<String>,
    /// When the last session ended.
    pub last_session_end: Option<DateTime<Utc>>,
}

impl SupervisorState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a session that ended without a transport failure.
    pub fn record_closed(&mut self, events: u64) {
        self.consecutive_failures = 0;
        self.events += events;
        self.last_error = None;
        self.last_session_end = Some(Utc::now());
    }

    /// Records a failed session.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
        self.last_session_end = Some(Utc::now());
    }
}

/// Shared supervisor state.
pub type SharedSupervisorState = Arc<RwLock<SupervisorState>>;

/// Keeps one notification session alive at all times.
pub struct Supervisor<C, S> {
    connector: C,
    sink: S,
    session_config: SessionConfig,
    policy: ReconnectPolicy,
    state: SharedSupervisorState,
}

impl<C, S> Supervisor<C, S>
where
    C: Connector,
    S: EventSink,
{
    /// Creates a supervisor.
    pub fn new(connector: C, sink: S, session_config: SessionConfig, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            sink,
            session_config,
            policy,
            state: Arc::new(RwLock::new(SupervisorState::new())),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSupervisorState {
        self.state.clone()
    }

    /// Runs sessions until `shutdown` is triggered.
    pub async fn run(mut self, shutdown: ShutdownHandle) {
        info!(endpoint = %self.session_config.endpoint, "supervisor started");

        while !shutdown.is_shutdown() {
            let attempt = {
                let mut state = self.state.write().await;
                state.sessions_started += 1;
                state.sessions_started
            };

            let session = NotificationSession::new(self.session_config.clone())
                .with_shutdown(shutdown.clone());
            debug!(attempt, subscription_id = session.subscription_id(), "starting session");

            let consecutive_failures = match session.run(&self.connector, &mut self.sink).await {
                Ok(report) => {
                    info!(
                        attempt,
                        events = report.events,
                        ignored = report.ignored,
                        interrupted = report.interrupted,
                        "session ended"
                    );
                    let mut state = self.state.write().await;
                    state.record_closed(report.events);
                    state.consecutive_failures
                }
                Err(e) => {
                    if e.is_transport() {
                        warn!(attempt, error = %e, "session failed, reconnecting");
                    } else {
                        error!(attempt, error = %e, "session failed unexpectedly, reconnecting");
                    }
                    let mut state = self.state.write().await;
                    state.record_failure(e.to_string());
                    state.consecutive_failures
                }
            };

            let delay = self.policy.delay(consecutive_failures);
            if delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }

            debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.wait().wait() => {}
            }
        }

        info!("supervisor stopped");
    }
}
