//! Ingestion session: subscription lifecycle and the message handler.
//!
//! The session connects through a [`Transport`], subscribes to one topic and,
//! for every message received while subscribed, decodes the payload and
//! appends it to the shared [`SampleBuffer`]. The handler runs on the
//! transport's delivery thread and never touches render state.
//!
//! ```text
//! Disconnected --start()--> Connecting --CONNACK--> Connected --SUBACK--> Subscribed
//!      ^                                                                      |
//!      +------------- stop() / connect failure / transport error -------------+
//! ```

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use log::{debug, info, warn};

use crate::buffer::SampleBuffer;
use crate::decoder::Decoder;
use crate::sample::{Channel, format_sample_line};
use crate::transport::{ConnectOptions, Transport, TransportError, TransportEvent};

// ---------------------------------------------------------------------------
// State + status
// ---------------------------------------------------------------------------

/// Lifecycle state of an [`IngestionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Subscribed = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Subscribed,
            _ => Self::Disconnected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Live counters written by the session, readable from any thread.
#[derive(Debug)]
pub struct SessionStatus {
    state: AtomicU8,
    received: AtomicU64,
    appended: AtomicU64,
    dropped: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Disconnected as u8),
            received: AtomicU64::new(0),
            appended: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }
}

impl SessionStatus {
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Copy of every counter at roughly one instant.
    pub fn view(&self) -> StatusView {
        StatusView {
            state: self.state(),
            received: self.received.load(Ordering::Relaxed),
            appended: self.appended.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            last_error: self.last_error.lock().unwrap().clone(),
        }
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn set(&self, to: SessionState) -> SessionState {
        SessionState::from_u8(self.state.swap(to as u8, Ordering::AcqRel))
    }

    fn record_error(&self, err: &TransportError) {
        *self.last_error.lock().unwrap() = Some(err.to_string());
    }
}

/// Plain-data copy of [`SessionStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub state: SessionState,
    /// Messages seen while subscribed.
    pub received: u64,
    /// Messages decoded and appended to the buffer.
    pub appended: u64,
    /// Messages rejected by the decoder.
    pub dropped: u64,
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything a session needs besides the transport and the buffer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connect: ConnectOptions,
    pub topic: String,
    pub decoder: Decoder,
    /// Channel names, used for the per-sample log line.
    pub channels: Vec<Channel>,
}

/// Owns the subscription lifecycle and feeds the sample buffer.
pub struct IngestionSession {
    core: Arc<SessionCore>,
}

struct SessionCore {
    transport: Arc<dyn Transport>,
    buffer: Arc<SampleBuffer>,
    config: SessionConfig,
    status: Arc<SessionStatus>,
}

impl IngestionSession {
    /// # Panics
    ///
    /// Panics if the decoder dimension differs from the buffer dimension.
    pub fn new(
        transport: Arc<dyn Transport>,
        buffer: Arc<SampleBuffer>,
        config: SessionConfig,
    ) -> Self {
        assert_eq!(
            config.decoder.dimension(),
            buffer.dimension(),
            "decoder dimension does not match buffer dimension"
        );
        Self {
            core: Arc::new(SessionCore {
                transport,
                buffer,
                config,
                status: Arc::new(SessionStatus::default()),
            }),
        }
    }

    /// Connect and begin the subscription handshake.
    ///
    /// Returns once the broker has accepted the connection; the subscription
    /// completes asynchronously. A no-op unless the session is disconnected.
    pub fn start(&self) -> Result<(), TransportError> {
        let core = &self.core;
        if !core
            .status
            .transition(SessionState::Disconnected, SessionState::Connecting)
        {
            debug!("session already started ({})", core.status.state());
            return Ok(());
        }

        let endpoint = core.config.connect.endpoint();
        info!("connecting to {endpoint}");
        let sink_core = Arc::clone(core);
        let result = core.transport.connect(
            &core.config.connect,
            Box::new(move |event| sink_core.handle_event(event)),
        );
        if let Err(e) = &result {
            core.status.record_error(e);
            core.status.set(SessionState::Disconnected);
        }
        result
    }

    /// Stop ingesting. Idempotent and safe from any thread, including the
    /// delivery thread. Once this returns no further sample is appended.
    pub fn stop(&self) {
        let previous = self.core.status.set(SessionState::Disconnected);
        if let Err(e) = self.core.transport.disconnect() {
            warn!("disconnect failed: {e}");
        }
        if previous != SessionState::Disconnected {
            info!("session stopped (was {previous})");
        }
    }

    /// Event entry point. Normally called by the transport on its delivery
    /// thread.
    pub fn handle_event(&self, event: TransportEvent) {
        self.core.handle_event(event);
    }

    pub fn state(&self) -> SessionState {
        self.core.status.state()
    }

    /// Shared handle to the live status.
    pub fn status(&self) -> Arc<SessionStatus> {
        Arc::clone(&self.core.status)
    }

    pub fn topic(&self) -> &str {
        &self.core.config.topic
    }
}

impl Drop for IngestionSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SessionCore {
    fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                if !self
                    .status
                    .transition(SessionState::Connecting, SessionState::Connected)
                {
                    debug!("ignoring CONNACK in state {}", self.status.state());
                    return;
                }
                let topic = &self.config.topic;
                debug!("subscribing to {topic}");
                if let Err(e) = self.transport.subscribe(topic) {
                    self.fail(e);
                }
            }
            TransportEvent::Subscribed => {
                if self
                    .status
                    .transition(SessionState::Connected, SessionState::Subscribed)
                {
                    info!("subscribed to {}", self.config.topic);
                }
            }
            TransportEvent::SubscribeRejected { topic } => {
                if self.status.state() == SessionState::Disconnected {
                    return;
                }
                self.fail(TransportError::Subscribe {
                    topic,
                    reason: "rejected by broker".into(),
                });
            }
            TransportEvent::Message { topic, payload } => self.on_message(&topic, &payload),
            TransportEvent::Disconnected(err) => {
                let previous = self.status.set(SessionState::Disconnected);
                match err {
                    Some(e) if previous != SessionState::Disconnected => {
                        warn!("transport disconnected: {e}");
                        self.status.record_error(&e);
                    }
                    _ => debug!("transport closed"),
                }
            }
        }
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        if self.status.state() != SessionState::Subscribed {
            return;
        }
        self.status.received.fetch_add(1, Ordering::Relaxed);

        match self.config.decoder.decode(payload) {
            Ok(values) => {
                let now = Local::now();
                self.buffer.append(now, &values);
                self.status.appended.fetch_add(1, Ordering::Relaxed);
                debug!("{}", format_sample_line(now, &self.config.channels, &values));
            }
            Err(e) => {
                self.status.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "dropping payload on {topic}: {e} ({:?})",
                    String::from_utf8_lossy(payload)
                );
            }
        }
    }

    fn fail(&self, err: TransportError) {
        if self.status.set(SessionState::Disconnected) == SessionState::Disconnected {
            // Already stopped; the transport error is a consequence of that.
            debug!("ignoring {err} after stop");
            return;
        }
        warn!("session failed: {err}");
        self.status.record_error(&err);
        if let Err(e) = self.transport.disconnect() {
            debug!("disconnect after failure: {e}");
        }
    }
}
