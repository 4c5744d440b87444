//! Runtime errors

use pressgate_connectors::ConnectorError;
use pressgate_core::ConfigError;
use thiserror::Error;

/// Errors surfaced by the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The device state lock was not acquired within the configured bound
    #[error("device state lock not acquired within {0} ms")]
    StateLockTimeout(u64),

    /// A bounded channel was already split
    #[error("channel already split: {0}")]
    ChannelTaken(&'static str),

    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Configuration file could not be read
    #[error("configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON for [`crate::RuntimeConfig`]
    #[error("configuration format: {0}")]
    Format(#[from] serde_json::Error),

    /// Transport setup failed
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}
