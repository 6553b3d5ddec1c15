//! Runtime configuration: broker, topic, window size and redraw interval.
//!
//! Loaded from an optional JSON file, then overridden field by field by the
//! command line. Anything left unset falls back to the sensor variant's
//! defaults.
//!
//! ```json
//! {
//!   "broker": { "host": "test.mosquitto.org", "port": 1883 },
//!   "topic": "esp32/0ad3/tx",
//!   "capacity": 300,
//!   "interval_ms": 1000
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::render::DEFAULT_RENDER_BUDGET;
use crate::buffer::MAX_CAPACITY;
use crate::transport::{ConnectOptions, Credentials, DEFAULT_MAX_PACKET_SIZE};
use crate::variant::SensorVariant;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Generated per run when absent.
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
    /// Largest MQTT packet accepted, in bytes.
    pub max_packet_bytes: usize,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 10,
            max_packet_bytes: DEFAULT_MAX_PACKET_SIZE,
            username: None,
            password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Full configuration of one visualizer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub broker: BrokerConfig,
    pub topic: String,
    /// Samples kept per channel. Variant default when `None`.
    pub capacity: Option<usize>,
    /// Redraw interval in milliseconds. Variant default when `None`.
    pub interval_ms: Option<u64>,
    /// Maximum points drawn in the trajectory panel.
    pub render_budget: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topic: String::new(),
            capacity: None,
            interval_ms: None,
            render_budget: DEFAULT_RENDER_BUDGET,
        }
    }
}

impl ScopeConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.broker.host.trim().is_empty() {
            return invalid("broker host is required");
        }
        if self.broker.port == 0 {
            return invalid("broker port must be non-zero");
        }
        if self.topic.trim().is_empty() {
            return invalid("topic is required");
        }
        match self.capacity {
            Some(0) => return invalid("buffer capacity must be at least 1"),
            Some(n) if n > MAX_CAPACITY => {
                return Err(ConfigError::Invalid(format!(
                    "buffer capacity must be at most {MAX_CAPACITY}"
                )));
            }
            _ => {}
        }
        if self.interval_ms == Some(0) {
            return invalid("render interval must be at least 1 ms");
        }
        if self.render_budget == 0 {
            return invalid("render budget must be at least 1");
        }
        if self.broker.connect_timeout_secs == 0 {
            return invalid("connect timeout must be at least 1 s");
        }
        if self.broker.max_packet_bytes == 0 {
            return invalid("max packet size must be at least 1 byte");
        }
        if self.broker.password.is_some() && self.broker.username.is_none() {
            return invalid("a password needs a username");
        }
        Ok(())
    }

    pub fn capacity(&self, variant: SensorVariant) -> usize {
        self.capacity.unwrap_or_else(|| variant.default_capacity())
    }

    pub fn interval(&self, variant: SensorVariant) -> Duration {
        self.interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| variant.default_interval())
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let b = &self.broker;
        ConnectOptions {
            host: b.host.clone(),
            port: b.port,
            client_id: b.client_id.clone().unwrap_or_else(generate_client_id),
            credentials: b.username.as_ref().map(|username| Credentials {
                username: username.clone(),
                password: b.password.clone(),
            }),
            keep_alive: Duration::from_secs(b.keep_alive_secs),
            connect_timeout: Duration::from_secs(b.connect_timeout_secs),
            max_packet_size: b.max_packet_bytes,
        }
    }
}

/// `sensorscope-` followed by the first 8 hex digits of a v4 UUID.
pub fn generate_client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("sensorscope-{}", &id[..8])
}
