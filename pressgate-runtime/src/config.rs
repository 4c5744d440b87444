//! Runtime configuration
//!
//! Every field has a default built from `pressgate_core::constants`, so a
//! JSON file only needs the values it changes:
//!
//! ```json
//! { "payload": { "device_id": "gw-0042" }, "batch": { "flush_timeout_ms": 2000 } }
//! ```

use std::path::Path;

use pressgate_connectors::PayloadConfig;
use pressgate_core::config::{BatchConfig, SignalConfig, SupervisorConfig, ValidationConfig};
use pressgate_core::constants::{sampling, transport, OUTBOUND_QUEUE_SIZE, STATS_LOG_INTERVAL_MS};
use pressgate_core::ConfigError;
use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Worker periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Reader poll period
    pub sample_interval_ms: u64,
    /// Telemetry worker drain period
    pub telemetry_interval_ms: u64,
    /// Formatter poll period
    pub formatter_interval_ms: u64,
    /// Bounded wait of the publisher on the outbound channel
    pub publish_wait_ms: u64,
    /// Health check period
    pub healthcheck_interval_ms: u64,
    /// Statistics log period
    pub stats_interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sample_interval_ms: sampling::SAMPLE_INTERVAL_MS,
            telemetry_interval_ms: transport::TELEMETRY_PROCESS_INTERVAL_MS,
            formatter_interval_ms: transport::FORMATTER_INTERVAL_MS,
            publish_wait_ms: 50,
            healthcheck_interval_ms: transport::HEALTHCHECK_INTERVAL_MS,
            stats_interval_ms: STATS_LOG_INTERVAL_MS,
        }
    }
}

/// Everything the gateway reads at start-up
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Filter, detector and accumulator tuning
    pub signal: SignalConfig,
    /// Reading range and bus fault policy
    pub validation: ValidationConfig,
    /// Batch flush policy
    pub batch: BatchConfig,
    /// Device identity and payload limits
    pub payload: PayloadConfig,
    /// Supervisor timing
    pub supervisor: SupervisorConfig,
    /// Worker periods
    pub timing: Timing,
    /// Outbound channel capacity; zero means the default
    pub outbound_capacity: usize,
}

impl RuntimeConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        self.validation.validate()?;
        self.supervisor.validate()?;
        if self.timing.sample_interval_ms == 0 {
            return Err(ConfigError::Zero { name: "sample_interval_ms" });
        }
        if self.payload.max_payload_size == 0 {
            return Err(ConfigError::Zero { name: "max_payload_size" });
        }
        Ok(())
    }

    /// Outbound channel capacity to use
    pub fn outbound_capacity(&self) -> usize {
        if self.outbound_capacity == 0 {
            OUTBOUND_QUEUE_SIZE
        } else {
            self.outbound_capacity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.outbound_capacity(), OUTBOUND_QUEUE_SIZE);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = RuntimeConfig::from_json(
            r#"{ "payload": { "device_id": "gw-0042" },
                 "batch": { "flush_timeout_ms": null },
                 "timing": { "sample_interval_ms": 20 } }"#,
        )
        .unwrap();

        assert_eq!(config.payload.device_id, "gw-0042");
        assert_eq!(config.batch.flush_timeout_ms, None);
        assert_eq!(config.timing.sample_interval_ms, 20);
        assert_eq!(config.timing.stats_interval_ms, STATS_LOG_INTERVAL_MS);
        assert_eq!(config.signal, SignalConfig::default());
    }

    #[test]
    fn invalid_section_is_rejected() {
        let json = r#"{ "signal": { "alpha_primary": 0.0 } }"#;
        let err = RuntimeConfig::from_json(json).unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));

        let err = RuntimeConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RuntimeError::Format(_)));
    }
}
