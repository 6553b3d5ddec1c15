//! Telemetry samples and the channels they are measured on.

use chrono::{DateTime, Local};

/// Wall-clock instant a sample was received.
pub type Timestamp = DateTime<Local>;

/// One measurement channel of a sensor (e.g. temperature, or the x axis of an
/// accelerometer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    /// Identifier used in logs and as the key in structured payloads.
    pub key: &'static str,
    /// Human-readable panel label.
    pub label: &'static str,
    /// Display unit (e.g. `"°C"`).
    pub unit: &'static str,
}

impl Channel {
    pub const fn new(key: &'static str, label: &'static str, unit: &'static str) -> Self {
        Self { key, label, unit }
    }
}

/// An immutable timestamped reading across every channel of a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    timestamp: Timestamp,
    values: Vec<f64>,
}

impl TelemetrySample {
    pub fn new(timestamp: Timestamp, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of channels in this sample.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Format a sample the way the ingestion log prints it:
/// `HH:MM:SS temperature=23.50 humidity=60.20 ...`.
pub fn format_sample_line(timestamp: Timestamp, channels: &[Channel], values: &[f64]) -> String {
    use std::fmt::Write;
    let mut line = timestamp.format("%H:%M:%S").to_string();
    for (channel, value) in channels.iter().zip(values) {
        let _ = write!(line, " {}={value:.2}", channel.key);
    }
    line
}
