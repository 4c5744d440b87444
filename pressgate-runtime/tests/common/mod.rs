//! Shared fixtures for runtime tests

#![allow(dead_code)]

use std::time::Duration;

use pressgate_core::OutboundMessage;
use pressgate_runtime::RuntimeConfig;
use tokio::sync::mpsc;

pub const DEVICE: &str = "gw-test";

/// Defaults with a short health interval and a fixed device id
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.payload.device_id = DEVICE.into();
    config.timing.healthcheck_interval_ms = 10_000;
    config
}

/// Everything published so far
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

/// Messages whose topic ends with `suffix`
pub fn on_topic<'a>(messages: &'a [OutboundMessage], suffix: &str) -> Vec<&'a OutboundMessage> {
    messages.iter().filter(|m| m.topic.ends_with(suffix)).collect()
}

/// Parse a payload as JSON
pub fn json(message: &OutboundMessage) -> serde_json::Value {
    serde_json::from_slice(&message.payload).expect("payload is JSON")
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}
