//! MQTT publisher over rumqttc
//!
//! [`MqttConnector::new`] returns two halves. The connector publishes
//! outbound messages; the [`MqttDriver`] owns the rumqttc event loop and
//! must be spawned on its own task; without it nothing leaves the socket.
//! The driver reports session changes as supervisor notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event as MqttEvent, EventLoop, MqttOptions, Packet};
use serde::{Deserialize, Serialize};

use pressgate_core::{Notification, Notifier, OutboundMessage, QoS};

use crate::{AsyncConnector, ConnectionStats, ConnectorError};

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier, usually the device id
    pub client_id: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Optional user name
    pub username: Option<String>,
    /// Optional password, used with `username`
    pub password: Option<String>,
    /// Pause before the event loop retries a dropped connection
    pub reconnect_delay_ms: u64,
    /// Requests buffered between the client and the event loop
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "pressgate".into(),
            keep_alive_secs: 30,
            username: None,
            password: None,
            reconnect_delay_ms: 5_000,
            request_capacity: 10,
        }
    }
}

impl MqttConfig {
    /// Settings for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set user name and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn options(&self) -> Result<MqttOptions, ConnectorError> {
        if self.host.is_empty() {
            return Err(ConnectorError::ConfigError("broker host is empty".into()));
        }
        if self.keep_alive_secs < 5 {
            return Err(ConnectorError::ConfigError(
                "keep alive must be at least 5 seconds".into(),
            ));
        }

        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            options.set_credentials(user.clone(), pass.clone());
        }
        Ok(options)
    }
}

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
    }
}

/// Publishing half of the MQTT session
pub struct MqttConnector {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    stats: ConnectionStats,
}

impl MqttConnector {
    /// Connector and the driver that must run alongside it
    pub fn new(config: &MqttConfig) -> Result<(Self, MqttDriver), ConnectorError> {
        let options = config.options()?;
        let (client, eventloop) = AsyncClient::new(options, config.request_capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));

        log::info!(
            "MQTT client {} for {}:{}",
            config.client_id, config.host, config.port
        );

        let connector = Self {
            client,
            connected: Arc::clone(&connected),
            stats: ConnectionStats::default(),
        };
        let driver = MqttDriver {
            eventloop,
            connected,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        };
        Ok((connector, driver))
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MqttConnector {
    type Error = ConnectorError;

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), Self::Error> {
        if !self.is_connected() {
            self.stats.record_failure(ConnectorError::NotConnected);
            return Err(ConnectorError::NotConnected);
        }

        let result = self
            .client
            .publish(
                message.topic.as_str(),
                to_mqtt_qos(message.qos),
                false,
                message.payload.clone(),
            )
            .await;

        match result {
            Ok(()) => {
                self.stats.record_sent(message.len());
                Ok(())
            }
            Err(e) => {
                let err = ConnectorError::ProtocolError(e.to_string());
                self.stats.record_failure(&err);
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}

/// Event-loop half of the MQTT session
pub struct MqttDriver {
    eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
}

impl MqttDriver {
    /// Poll the session forever, reporting connection changes
    ///
    /// `TRANSPORT_CONNECTED` is posted on every accepted CONNACK;
    /// `TRANSPORT_DISCONNECTED` once per lost session.
    pub async fn run<N: Notifier>(mut self, notifier: N) {
        loop {
            match self.eventloop.poll().await {
                Ok(MqttEvent::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        self.connected.store(true, Ordering::Release);
                        log::info!("MQTT session established");
                        notifier.notify(Notification::TRANSPORT_CONNECTED);
                    } else {
                        log::warn!("MQTT broker refused connection: {:?}", ack.code);
                        self.on_lost(&notifier);
                        tokio::time::sleep(self.reconnect_delay).await;
                    }
                }
                Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                    self.on_lost(&notifier);
                }
                Ok(_) => {}
                Err(e) => {
                    if self.connected.load(Ordering::Acquire) {
                        log::warn!("MQTT connection lost: {}", e);
                    } else {
                        log::debug!("MQTT connect attempt failed: {}", e);
                    }
                    self.on_lost(&notifier);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn on_lost<N: Notifier>(&self, notifier: &N) {
        if self.connected.swap(false, Ordering::AcqRel) {
            notifier.notify(Notification::TRANSPORT_DISCONNECTED);
        }
    }
}
