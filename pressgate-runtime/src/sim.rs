//! Simulated collaborators for running the gateway on a host
//!
//! - [`SimulatedSensor`]: a water line that sits at supply pressure, opens
//!   a valve, holds, and closes again, with ADC noise and optional bus
//!   fault bursts.
//! - [`SimulatedNetwork`]: answers each connectivity state the way the
//!   network and provisioning collaborators would.
//! - [`LogConnector`]: a transport that logs what it would publish.

use std::time::Duration;

use pressgate_connectors::{AsyncConnector, ConnectionStats, ConnectorError};
use pressgate_core::{Notification, OutboundMessage, ReadingSource, SystemState};
use tokio::sync::mpsc;

use crate::supervisor::Supervisor;

const SUPPLY_PRESSURE: u32 = 3_450_000;
const OPEN_PRESSURE: u32 = 2_900_000;
const NOISE_AMPLITUDE: u32 = 1_500;

/// One simulated valve cycle, in samples
const CYCLE: [(u32, u32); 4] = [
    // (samples, target) - hold, open ramp, hold open, close ramp
    (300, SUPPLY_PRESSURE),
    (25, OPEN_PRESSURE),
    (250, OPEN_PRESSURE),
    (25, SUPPLY_PRESSURE),
];

/// Synthetic pressure sensor
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    tick: u64,
    seed: u32,
    fault_every: u64,
    fault_burst: u64,
    reinits: u32,
}

impl SimulatedSensor {
    /// Sensor with noise drawn from `seed`
    pub fn new(seed: u32) -> Self {
        Self {
            tick: 0,
            seed: seed.max(1),
            fault_every: 0,
            fault_burst: 6,
            reinits: 0,
        }
    }

    /// Inject a burst of bus faults every `ticks` samples; zero disables
    pub fn with_fault_every(mut self, ticks: u64) -> Self {
        self.fault_every = ticks;
        self
    }

    /// Times the bus was reinitialized
    pub fn reinits(&self) -> u32 {
        self.reinits
    }

    fn noise(&mut self) -> i64 {
        self.seed = self.seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let span = u64::from(2 * NOISE_AMPLITUDE + 1);
        (u64::from(self.seed >> 8) % span) as i64 - i64::from(NOISE_AMPLITUDE)
    }

    /// Noise-free value at sample `tick`
    pub fn profile(tick: u64) -> u32 {
        let period: u64 = CYCLE.iter().map(|(n, _)| u64::from(*n)).sum();
        let mut t = tick % period;
        let mut from = CYCLE[CYCLE.len() - 1].1;

        for (samples, target) in CYCLE {
            let samples = u64::from(samples);
            if t < samples {
                let from_f = f64::from(from);
                let step = (f64::from(target) - from_f) * (t + 1) as f64 / samples as f64;
                return (from_f + step) as u32;
            }
            t -= samples;
            from = target;
        }
        SUPPLY_PRESSURE
    }

    fn in_fault_burst(&self) -> bool {
        if self.fault_every == 0 {
            return false;
        }
        let burst = self.fault_burst.min(self.fault_every);
        self.tick % self.fault_every >= self.fault_every - burst
    }
}

impl ReadingSource for SimulatedSensor {
    type Error = &'static str;

    fn read_raw(&mut self) -> nb::Result<u32, Self::Error> {
        let faulted = self.in_fault_burst();
        let tick = self.tick;
        self.tick += 1;

        if faulted {
            return Err(nb::Error::Other("simulated bus timeout"));
        }

        let value = i64::from(Self::profile(tick)) + self.noise();
        Ok(value.max(0) as u32)
    }

    fn reinitialize(&mut self) -> Result<(), Self::Error> {
        self.reinits += 1;
        Ok(())
    }
}

/// Connectivity and provisioning collaborators
#[derive(Debug, Clone, Copy)]
pub struct SimulatedNetwork {
    /// Delay before association succeeds
    pub connect_delay: Duration,
    /// Also report the transport session, when no real transport does
    pub report_transport: bool,
    /// State poll period
    pub poll: Duration,
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(500),
            report_transport: true,
            poll: Duration::from_millis(100),
        }
    }
}

impl SimulatedNetwork {
    /// Answer every state change until dropped
    pub async fn run(self, supervisor: &Supervisor) {
        let bus = supervisor.bus().clone();
        let mut last = None;

        loop {
            match supervisor.get_state().await {
                Ok(state) if last != Some(state) => {
                    last = Some(state);
                    match state {
                        SystemState::Connecting | SystemState::ConfigMode => {
                            tokio::time::sleep(self.connect_delay).await;
                            bus.post(Notification::WIFI_CONNECTED);
                        }
                        SystemState::ConfigMqtt => bus.post(Notification::CREDENTIALS_READY),
                        SystemState::ConnectedWifi if self.report_transport => {
                            bus.post(Notification::TRANSPORT_CONNECTED);
                        }
                        _ => {}
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("network simulator: {}", e),
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Transport that logs messages instead of publishing them
#[derive(Debug, Default)]
pub struct LogConnector {
    tap: Option<mpsc::UnboundedSender<OutboundMessage>>,
    stats: ConnectionStats,
}

impl LogConnector {
    /// Logging only
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward every message to `tap`
    pub fn with_tap(tap: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tap: Some(tap), stats: ConnectionStats::default() }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for LogConnector {
    type Error = ConnectorError;

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), Self::Error> {
        log::info!(
            "publish {} ({} bytes): {}",
            message.topic,
            message.len(),
            String::from_utf8_lossy(&message.payload)
        );

        if let Some(tap) = &self.tap {
            if tap.send(message.clone()).is_err() {
                self.stats.record_failure(ConnectorError::NotConnected);
                return Err(ConnectorError::NotConnected);
            }
        }
        self.stats.record_sent(message.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.tap.as_ref().map_or(true, |tap| !tap.is_closed())
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
