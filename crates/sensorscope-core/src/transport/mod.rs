//! Messaging boundary: connect, subscribe, receive.
//!
//! The pipeline never talks to a broker directly. It consumes the [`Transport`]
//! capability, which owns its own delivery thread and hands every inbound
//! event to an [`EventSink`] supplied at connect time.
//!
//! Two implementations ship with the crate:
//! - [`mqtt::MqttTransport`]: a real MQTT 3.1.1 client (`rumqttc`).
//! - [`memory::MemoryTransport`]: an in-process broker stand-in used to
//!   drive the pipeline deterministically in tests.

pub mod memory;
pub mod mqtt;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Default incoming and outgoing MQTT packet limit (1 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1 << 20;

/// Failure at the messaging boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker could not be reached (DNS, TCP, TLS, ...).
    #[error("could not connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    /// The broker answered but refused the session (bad credentials, ...).
    #[error("broker refused the connection: {0}")]
    Refused(String),
    /// No answer from the broker within the connect timeout.
    #[error("no answer from {endpoint} within {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    /// The subscription request failed or was rejected.
    #[error("subscription to {topic:?} failed: {reason}")]
    Subscribe { topic: String, reason: String },
    /// An established connection broke.
    #[error("connection lost: {0}")]
    Connection(String),
    /// Operation requires an open connection.
    #[error("not connected")]
    NotConnected,
    /// The delivery thread could not be started.
    #[error("could not start delivery thread: {0}")]
    Spawn(String),
}

/// Username/password pair. The password is optional, as MQTT allows.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything needed to open a broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Anonymous connection when `None`.
    pub credentials: Option<Credentials>,
    pub keep_alive: Duration,
    /// Upper bound on how long [`Transport::connect`] waits for the broker.
    pub connect_timeout: Duration,
    /// Largest packet accepted from the broker, in bytes.
    pub max_packet_size: usize,
}

impl ConnectOptions {
    /// `host:port`, for logs and error messages.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Event delivered by a transport on its delivery thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the connection.
    Connected,
    /// The broker acknowledged the subscription.
    Subscribed,
    /// The broker rejected the subscription.
    SubscribeRejected { topic: String },
    /// A message arrived.
    Message { topic: String, payload: Vec<u8> },
    /// The connection ended. `None` for an orderly close.
    Disconnected(Option<TransportError>),
}

/// Callback invoked for every event, always from the transport's delivery
/// thread and never concurrently with itself.
pub type EventSink = Box<dyn FnMut(TransportEvent) + Send + 'static>;

/// Publish/subscribe capability consumed by the ingestion session.
pub trait Transport: Send + Sync {
    /// Open a connection and start delivering events to `sink`.
    ///
    /// Blocks until the broker accepts or refuses the connection, bounded by
    /// `options.connect_timeout`. On success the first event delivered is
    /// [`TransportEvent::Connected`]. On failure no event is ever delivered.
    fn connect(&self, options: &ConnectOptions, sink: EventSink) -> Result<(), TransportError>;

    /// Request a subscription. The outcome arrives later as
    /// [`TransportEvent::Subscribed`] or [`TransportEvent::SubscribeRejected`].
    /// Safe to call from inside the sink.
    fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    ///
    /// When called from any thread other than the delivery thread, returns
    /// only after the delivery thread has stopped, so no sink call can follow.
    /// When called from inside the sink, no further sink call is started after
    /// the current one returns.
    fn disconnect(&self) -> Result<(), TransportError>;
}
