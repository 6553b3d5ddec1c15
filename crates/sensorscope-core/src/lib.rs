//! # sensorscope-core
//!
//! **Watch a live sensor through MQTT.**
//!
//! `sensorscope-core` is the ingestion → buffering → rendering pipeline behind
//! the `sensorscope` terminal visualizer. It subscribes to a topic, decodes
//! each payload into a fixed set of channels, keeps a bounded window of recent
//! samples, and hands a derived, auto-scaled frame to a drawing surface on a
//! fixed interval.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sensorscope_core::{MqttTransport, Orchestrator, ScopeConfig, SensorVariant};
//! # use sensorscope_core::render::{Control, RenderFrame, RenderTickError, Surface};
//! # struct Stdout;
//! # impl Surface for Stdout {
//! #     fn present(&mut self, f: &RenderFrame) -> Result<(), RenderTickError> {
//! #         println!("{} samples", f.sample_count);
//! #         Ok(())
//! #     }
//! #     fn idle(&mut self, t: std::time::Duration) -> Result<Control, RenderTickError> {
//! #         std::thread::sleep(t);
//! #         Ok(Control::Continue)
//! #     }
//! # }
//!
//! let mut config = ScopeConfig::default();
//! config.broker.host = "test.mosquitto.org".into();
//! config.topic = "esp32/0ad3/tx".into();
//!
//! let mut scope = Orchestrator::new(&config, SensorVariant::Climate, Arc::new(MqttTransport::new()))?;
//! scope.run(&mut Stdout)?;
//! # Ok::<(), sensorscope_core::ScopeError>(())
//! ```
//!
//! ## Architecture
//!
//! Broker → [`IngestionSession`] (decode, append) → [`SampleBuffer`] ←
//! snapshot ← [`RenderLoop`] → [`Surface`]
//!
//! The session runs on the transport's delivery thread; the render loop runs on
//! the caller's thread. The buffer is the only state they share.

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod sample;
pub mod session;
pub mod transport;
pub mod variant;

pub use buffer::{SampleBuffer, Snapshot};
pub use config::{BrokerConfig, ConfigError, ScopeConfig};
pub use decoder::{DecodeError, Decoder, PayloadFormat};
pub use error::ScopeError;
pub use orchestrator::Orchestrator;
pub use render::{
    AxisBounds, Control, LoopExit, PanelLayout, RenderFrame, RenderLoop, RenderTickError, Surface,
};
pub use sample::{Channel, TelemetrySample, Timestamp};
pub use session::{IngestionSession, SessionConfig, SessionState, SessionStatus, StatusView};
pub use transport::memory::MemoryTransport;
pub use transport::mqtt::MqttTransport;
pub use transport::{ConnectOptions, Credentials, Transport, TransportError, TransportEvent};
pub use variant::SensorVariant;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
