//! HTTP health checks
//!
//! Deployments that report liveness to an HTTP ingestion endpoint rather
//! than to the broker use [`HttpSender`] as their [`HealthSender`]. The
//! body is the same `{"gatewayId", "uptime"}` document; the API key goes
//! in the `Authorization` header as is.
//!
//! The request is blocking (ureq). Call it from a blocking context, e.g.
//! `tokio::task::spawn_blocking`, when driving it from async code.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pressgate_core::Timestamp;

use crate::health::{health_body, HealthSender};
use crate::{ConnectionStats, ConnectorError};

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status
    #[error("Server error {0}")]
    Status(u16),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HttpError> for ConnectorError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Config(msg) => ConnectorError::ConfigError(msg),
            other => ConnectorError::ProtocolError(other.to_string()),
        }
    }
}

/// Health endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Full endpoint URL
    pub url: String,
    /// Value of the `Authorization` header
    pub api_key: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_ms: 10_000,
            user_agent: format!("pressgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Settings for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the request timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// Health checks posted over HTTP
pub struct HttpSender {
    config: HttpConfig,
    device_id: String,
    agent: ureq::Agent,
    stats: ConnectionStats,
}

impl HttpSender {
    /// Sender for `device_id`
    pub fn new(config: HttpConfig, device_id: impl Into<String>) -> Result<Self, HttpError> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(HttpError::Config("URL must start with http:// or https://".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            device_id: device_id.into(),
            agent,
            stats: ConnectionStats::default(),
        })
    }

    /// Delivery statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    fn post(&self, body: &str) -> Result<(), HttpError> {
        let response = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", "application/json")
            .set("Authorization", &self.config.api_key)
            .send_string(body);

        match response {
            Ok(resp) if resp.status() < 300 => Ok(()),
            Ok(resp) => Err(HttpError::Status(resp.status())),
            Err(ureq::Error::Status(code, _)) => Err(HttpError::Status(code)),
            Err(ureq::Error::Transport(e)) => Err(HttpError::Request(e.to_string())),
        }
    }
}

impl HealthSender for HttpSender {
    fn send(&mut self, now: Timestamp) -> Result<(), ConnectorError> {
        let body = health_body(&self.device_id, now)?;
        let body =
            String::from_utf8(body).map_err(|e| ConnectorError::ProtocolError(e.to_string()))?;

        match self.post(&body) {
            Ok(()) => {
                self.stats.record_sent(body.len());
                Ok(())
            }
            Err(err) => {
                self.stats.record_failure(&err);
                Err(err.into())
            }
        }
    }
}
