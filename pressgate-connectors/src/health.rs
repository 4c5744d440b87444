//! Periodic health checks
//!
//! A health check is a tiny `{"gatewayId", "uptime"}` document. Where it
//! goes depends on the deployment, hence the [`HealthSender`] seam:
//! [`QueueSender`] puts it on the outbound channel next to the event
//! batches, and `http::HttpSender` posts it to an ingestion endpoint.
//!
//! [`HealthCheck`] owns the schedule. A check is due once *more* than the
//! interval has passed since the last successful send; a failed send does
//! not move the schedule, so the next tick retries.

use serde::Serialize;

use pressgate_core::time::elapsed_ms;
use pressgate_core::{OutboundMessage, OutboundSink, QoS, Timestamp};

use crate::payload::PayloadConfig;
use crate::ConnectorError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthDoc<'a> {
    gateway_id: &'a str,
    uptime: u64,
}

/// Render the health document for `device_id` at `uptime_ms`
pub fn health_body(device_id: &str, uptime_ms: u64) -> Result<Vec<u8>, ConnectorError> {
    serde_json::to_vec(&HealthDoc { gateway_id: device_id, uptime: uptime_ms })
        .map_err(|e| ConnectorError::ProtocolError(e.to_string()))
}

/// Destination of health checks
pub trait HealthSender {
    /// Send one check stamped with `now`
    fn send(&mut self, now: Timestamp) -> Result<(), ConnectorError>;
}

impl<H: HealthSender + ?Sized> HealthSender for Box<H> {
    fn send(&mut self, now: Timestamp) -> Result<(), ConnectorError> {
        (**self).send(now)
    }
}

/// Health checks through the outbound channel
pub struct QueueSender<S: OutboundSink> {
    sink: S,
    device_id: String,
    topic: String,
}

impl<S: OutboundSink> QueueSender<S> {
    /// Sender for the device in `config`
    pub fn new(sink: S, config: &PayloadConfig) -> Self {
        Self {
            sink,
            device_id: config.device_id.clone(),
            topic: config.health_topic(),
        }
    }
}

impl<S: OutboundSink> HealthSender for QueueSender<S> {
    fn send(&mut self, now: Timestamp) -> Result<(), ConnectorError> {
        let message = OutboundMessage {
            topic: self.topic.clone(),
            payload: health_body(&self.device_id, now)?,
            qos: QoS::AtMostOnce,
        };

        self.sink.try_send(message).map_err(|_| ConnectorError::BufferFull)
    }
}

/// Schedule of health checks over a [`HealthSender`]
pub struct HealthCheck<H: HealthSender> {
    sender: H,
    last_sent: Timestamp,
    interval_ms: u64,
    sent: u32,
    failed: u32,
}

impl<H: HealthSender> HealthCheck<H> {
    /// Checks every `interval_ms`, the first one due an interval after boot
    pub fn new(sender: H, interval_ms: u64) -> Self {
        Self {
            sender,
            last_sent: 0,
            interval_ms,
            sent: 0,
            failed: 0,
        }
    }

    /// True once more than the interval has passed since the last success
    pub fn is_due(&self, now: Timestamp) -> bool {
        elapsed_ms(self.last_sent, now) > self.interval_ms
    }

    /// Send now, whatever the schedule says
    pub fn send(&mut self, now: Timestamp) -> Result<(), ConnectorError> {
        match self.sender.send(now) {
            Ok(()) => {
                self.last_sent = now;
                self.sent += 1;
                log::info!("health check sent at {} ms", now);
                Ok(())
            }
            Err(err) => {
                self.failed += 1;
                log::warn!("health check failed: {}", err);
                Err(err)
            }
        }
    }

    /// Send if due; returns whether a check went out
    pub fn tick(&mut self, now: Timestamp) -> Result<bool, ConnectorError> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.send(now).map(|()| true)
    }

    /// Time of the last successful check
    pub fn last_sent(&self) -> Timestamp {
        self.last_sent
    }

    /// (successful, failed) sends
    pub fn counts(&self) -> (u32, u32) {
        (self.sent, self.failed)
    }

    /// The wrapped sender
    pub fn sender(&self) -> &H {
        &self.sender
    }
}
