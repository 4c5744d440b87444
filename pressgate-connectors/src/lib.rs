//! Payload Encoding and Transport Connectors for Pressgate
//!
//! ## Overview
//!
//! Everything between a batch of finalized events and the broker:
//!
//! ```text
//! [Event; B] → JsonEncoder → OutboundMessage → outbound channel → AsyncConnector
//!                                                          ↑
//!                                  HealthCheck ──→ QueueSender
//! ```
//!
//! ## Protocols
//!
//! ### MQTT (feature `mqtt`, default)
//!
//! The gateway's only data path. Pressure events go to
//! `{prefix}/{device_id}/pressure-events` at QoS 0: a lost batch is
//! preferable to a blocked publisher holding the outbound channel.
//!
//! The event loop is driven by [`mqtt::MqttDriver`], which posts
//! `TRANSPORT_CONNECTED` / `TRANSPORT_DISCONNECTED` to the supervisor so
//! that the publishing workers follow the broker connection.
//!
//! ### HTTP (feature `http`)
//!
//! Only used for health checks when a deployment reports to an HTTP
//! ingestion endpoint instead of the broker.
//!
//! ## Payload Size
//!
//! The broker accepts 4096 bytes per message. The encoder first renders a
//! batch with sample detail, then without it, and rejects the batch if it
//! still does not fit. See [`payload`].
//!
//! ## Example Usage
//!
//! ```rust
//! use pressgate_connectors::payload::{JsonEncoder, PayloadConfig};
//! use pressgate_core::{BatchEncoder, Event, StableSummary};
//!
//! let mut encoder = JsonEncoder::new(PayloadConfig::new("gw-0042"));
//! let event = Event::Stable(StableSummary {
//!     start_timestamp: 0,
//!     end_timestamp: 5_000,
//!     sample_count: 51,
//!     average: 3_450_000,
//!     min: 3_449_800,
//!     max: 3_450_300,
//! });
//!
//! let message = encoder.encode(&[event], 5_100)?;
//! assert_eq!(message.topic, "mica/dev/telemetry/gateway/gw-0042/pressure-events");
//! # Ok::<(), pressgate_core::EncodeError>(())
//! ```

pub mod health;
pub mod payload;

#[cfg(feature = "std")]
pub mod outbound;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "http")]
pub mod http;

// Re-export common types
pub use health::{HealthCheck, HealthSender, QueueSender};
pub use payload::{JsonEncoder, PayloadConfig};

#[cfg(feature = "std")]
pub use outbound::{outbound_channel, OutboundSender};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttDriver};

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpSender};

use pressgate_core::OutboundMessage;
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Buffer full")]
    BufferFull,

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Async transport for outbound messages
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    type Error: std::fmt::Display + Send;

    /// Deliver one message
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count a delivered message of `bytes`
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count a failed delivery
    pub fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}
