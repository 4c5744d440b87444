//! Device Lifecycle Rules
//!
//! ## Overview
//!
//! The gateway moves through a small set of connectivity states. Workers and
//! external collaborators report what happened as [`Notification`] bits; the
//! supervisor folds one delivery at a time into the current state with
//! [`next_state`] and then enables exactly the workers listed by
//! [`enabled_workers`] for the resulting state.
//!
//! Both functions are pure. Locking, waiting and restarting belong to the
//! runtime that owns the state value.
//!
//! ## State Graph
//!
//! ```text
//!                wifi up              creds ready           transport up
//! ┌──────────┐ ─────────► ┌────────────┐ ─────────► ┌───────────────┐ ────────► ┌───────────────┐
//! │Connecting│            │ ConfigMqtt │            │ ConnectedWifi │           │ ConnectedMqtt │
//! └──────────┘ ◄──────────────────────────────────────────────────────────────── └───────────────┘
//!      │                    ▲            wifi lost          transport down │  │ ota requested
//!      │ no credentials     │ wifi up                ────────────────────────┘  ▼
//!      ▼                    │                                          ┌───────────┐
//! ┌──────────┐ ─────────────┘                                          │ OtaUpdate │
//! │ConfigMode│ ◄──── long press (from any state)                       └───────────┘
//! └──────────┘
//! ```
//!
//! A button press from any state parks the device in
//! `WaitingButtonRelease`; the release returns it to `Connecting`.
//! `Error` is terminal for the process.
//!
//! ## Evaluation Order Within One Delivery
//!
//! 1. Empty delivery: no change.
//! 2. `Error` absorbs everything.
//! 3. `LONG_PRESS` → `ConfigMode`, and no other bit is looked at.
//! 4. Per-state rules, in the order listed in [`next_state`]; when two rules
//!    fire, the later one wins.
//! 5. `BUTTON_PRESSED` → `WaitingButtonRelease`, overriding step 4.
//! 6. `FATAL_ERROR` → `Error`, overriding everything but step 3.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Device lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemState {
    /// Associating with the access point
    Connecting,
    /// Network is up, transport credentials being prepared
    ConfigMqtt,
    /// Network up, transport session not yet established
    ConnectedWifi,
    /// Fully connected; telemetry may be flushed
    ConnectedMqtt,
    /// Provisioning portal active
    ConfigMode,
    /// Button held; waiting to see whether it is a long press
    WaitingButtonRelease,
    /// Firmware image being replaced
    OtaUpdate,
    /// Terminal; the process restarts after a grace period
    Error,
}

impl SystemState {
    /// All states, in declaration order
    pub const ALL: [SystemState; 8] = [
        SystemState::Connecting,
        SystemState::ConfigMqtt,
        SystemState::ConnectedWifi,
        SystemState::ConnectedMqtt,
        SystemState::ConfigMode,
        SystemState::WaitingButtonRelease,
        SystemState::OtaUpdate,
        SystemState::Error,
    ];

    /// Stable, log-friendly name
    pub const fn name(self) -> &'static str {
        match self {
            SystemState::Connecting => "CONNECTING",
            SystemState::ConfigMqtt => "CONFIG_MQTT",
            SystemState::ConnectedWifi => "CONNECTED_WIFI",
            SystemState::ConnectedMqtt => "CONNECTED_MQTT",
            SystemState::ConfigMode => "CONFIG_MODE",
            SystemState::WaitingButtonRelease => "WAITING_BUTTON_RELEASE",
            SystemState::OtaUpdate => "OTA_UPDATE",
            SystemState::Error => "ERROR",
        }
    }

    /// Only the fully connected state may flush telemetry
    pub const fn can_publish_telemetry(self) -> bool {
        matches!(self, SystemState::ConnectedMqtt)
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask of events delivered to the supervisor
///
/// Several bits may arrive in one delivery.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Notification(u32);

impl Notification {
    /// Network association succeeded
    pub const WIFI_CONNECTED: Self = Self(1 << 0);
    /// Network association lost
    pub const WIFI_DISCONNECTED: Self = Self(1 << 1);
    /// Network association attempt failed; retried by the collaborator
    pub const WIFI_CONNECT_FAILED: Self = Self(1 << 2);
    /// No network credentials stored
    pub const NO_STORED_CREDENTIALS: Self = Self(1 << 3);
    /// Transport credentials loaded and usable
    pub const CREDENTIALS_READY: Self = Self(1 << 4);
    /// Transport session established
    pub const TRANSPORT_CONNECTED: Self = Self(1 << 5);
    /// Transport session lost or a publish failed
    pub const TRANSPORT_DISCONNECTED: Self = Self(1 << 6);
    /// Firmware update requested by the backend
    pub const OTA_REQUESTED: Self = Self(1 << 7);
    /// Button went down
    pub const BUTTON_PRESSED: Self = Self(1 << 8);
    /// Button went up before the long-press threshold
    pub const BUTTON_RELEASED: Self = Self(1 << 9);
    /// Button held past the long-press threshold
    pub const LONG_PRESS: Self = Self(1 << 10);
    /// A bounded channel dropped its first item
    pub const QUEUE_FULL: Self = Self(1 << 11);
    /// Sensor bus was reinitialized after repeated faults
    pub const BUS_ERROR_RECOVERED: Self = Self(1 << 12);
    /// Unrecoverable failure; the device must restart
    pub const FATAL_ERROR: Self = Self(1 << 13);

    const NAMES: [(Notification, &'static str); 14] = [
        (Self::WIFI_CONNECTED, "WIFI_CONNECTED"),
        (Self::WIFI_DISCONNECTED, "WIFI_DISCONNECTED"),
        (Self::WIFI_CONNECT_FAILED, "WIFI_CONNECT_FAILED"),
        (Self::NO_STORED_CREDENTIALS, "NO_STORED_CREDENTIALS"),
        (Self::CREDENTIALS_READY, "CREDENTIALS_READY"),
        (Self::TRANSPORT_CONNECTED, "TRANSPORT_CONNECTED"),
        (Self::TRANSPORT_DISCONNECTED, "TRANSPORT_DISCONNECTED"),
        (Self::OTA_REQUESTED, "OTA_REQUESTED"),
        (Self::BUTTON_PRESSED, "BUTTON_PRESSED"),
        (Self::BUTTON_RELEASED, "BUTTON_RELEASED"),
        (Self::LONG_PRESS, "LONG_PRESS"),
        (Self::QUEUE_FULL, "QUEUE_FULL"),
        (Self::BUS_ERROR_RECOVERED, "BUS_ERROR_RECOVERED"),
        (Self::FATAL_ERROR, "FATAL_ERROR"),
    ];

    /// No bits set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Rebuild from raw bits, keeping unknown bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if no bit is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for Notification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Notification {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Notification(empty)");
        }
        f.write_str("Notification(")?;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

/// Fold one notification delivery into the current state
pub fn next_state(current: SystemState, notification: Notification) -> SystemState {
    use SystemState::*;

    if notification.is_empty() || current == Error {
        return current;
    }

    if notification.contains(Notification::LONG_PRESS) {
        return ConfigMode;
    }

    let mut next = current;
    match current {
        Connecting => {
            if notification.contains(Notification::WIFI_CONNECTED) {
                next = ConfigMqtt;
            }
            if notification.contains(Notification::NO_STORED_CREDENTIALS) {
                next = ConfigMode;
            }
            // WIFI_CONNECT_FAILED: stay, the collaborator retries
        }
        ConfigMqtt => {
            if notification.contains(Notification::CREDENTIALS_READY) {
                next = ConnectedWifi;
            }
        }
        ConnectedWifi => {
            if notification.contains(Notification::TRANSPORT_CONNECTED) {
                next = ConnectedMqtt;
            }
        }
        ConnectedMqtt => {
            if notification.contains(Notification::TRANSPORT_DISCONNECTED) {
                next = ConfigMqtt;
            }
            if notification.contains(Notification::WIFI_DISCONNECTED) {
                next = Connecting;
            }
            if notification.contains(Notification::OTA_REQUESTED) {
                next = OtaUpdate;
            }
        }
        ConfigMode => {
            if notification.contains(Notification::WIFI_CONNECTED) {
                next = ConfigMqtt;
            }
        }
        WaitingButtonRelease => {
            if notification.contains(Notification::BUTTON_RELEASED) {
                next = Connecting;
            }
        }
        OtaUpdate | Error => {}
    }

    if notification.contains(Notification::BUTTON_PRESSED) {
        next = WaitingButtonRelease;
    }

    if notification.contains(Notification::FATAL_ERROR) {
        next = Error;
    }

    next
}

/// Independently scheduled worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Worker {
    /// Network association collaborator
    WifiConnect = 0,
    /// Provisioning portal collaborator
    WifiConfig = 1,
    /// Transport session setup collaborator
    TransportConnect = 2,
    /// Outbound message publisher and health checks
    TransportPublish = 3,
    /// Sensor reader
    Reader = 4,
    /// Signal pipeline
    Telemetry = 5,
    /// Message batcher
    Formatter = 6,
    /// Button watcher
    Button = 7,
    /// Firmware update collaborator
    Ota = 8,
}

impl Worker {
    /// All workers, in declaration order
    pub const ALL: [Worker; 9] = [
        Worker::WifiConnect,
        Worker::WifiConfig,
        Worker::TransportConnect,
        Worker::TransportPublish,
        Worker::Reader,
        Worker::Telemetry,
        Worker::Formatter,
        Worker::Button,
        Worker::Ota,
    ];

    const fn bit(self) -> u16 {
        1 << self as u8
    }
}

/// Set of enabled workers
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorkerSet(u16);

impl WorkerSet {
    /// Every worker suspended
    pub const EMPTY: Self = Self(0);

    /// Build from a list of workers
    pub const fn of(workers: &[Worker]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < workers.len() {
            bits |= workers[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// True if `worker` is enabled
    pub const fn contains(self, worker: Worker) -> bool {
        self.0 & worker.bit() != 0
    }

    /// True if no worker is enabled
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Enabled workers, in declaration order
    pub fn iter(self) -> impl Iterator<Item = Worker> {
        Worker::ALL.into_iter().filter(move |w| self.contains(*w))
    }
}

impl fmt::Debug for WorkerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Workers that run in `state`
///
/// The pipeline (reader, telemetry, formatter) only runs once the network
/// is up, and never alongside provisioning or flashing.
pub const fn enabled_workers(state: SystemState) -> WorkerSet {
    use Worker::*;

    match state {
        SystemState::Connecting => WorkerSet::of(&[WifiConnect]),
        SystemState::ConfigMqtt => WorkerSet::of(&[WifiConnect, TransportConnect]),
        SystemState::ConnectedWifi => {
            WorkerSet::of(&[WifiConnect, TransportPublish, Reader, Telemetry])
        }
        SystemState::ConnectedMqtt => {
            WorkerSet::of(&[WifiConnect, TransportPublish, Reader, Telemetry, Formatter])
        }
        SystemState::ConfigMode => WorkerSet::of(&[WifiConfig]),
        SystemState::WaitingButtonRelease => WorkerSet::of(&[Button]),
        SystemState::OtaUpdate => WorkerSet::of(&[Ota]),
        SystemState::Error => WorkerSet::EMPTY,
    }
}
