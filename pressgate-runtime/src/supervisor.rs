//! Device supervisor
//!
//! ## Overview
//!
//! The supervisor owns the device state. Every tick it takes at most one
//! delivery from the [`NotificationBus`], folds it into the state with
//! [`next_state`], and re-applies the worker table for the resulting
//! state. Re-applying every tick (not only on a transition) means a worker
//! that was recreated picks up the right enable flag without special
//! handling.
//!
//! ## State Access
//!
//! Nothing else holds the state cell. Readers go through
//! [`Supervisor::get_state`], which waits for the lock at most
//! `lock_timeout_ms` and returns [`RuntimeError::StateLockTimeout`]
//! instead of blocking. Under correct sizing that never happens; callers
//! log it and skip the operation.
//!
//! ## Error State
//!
//! Entering `Error` suspends every worker, waits the configured grace
//! period, and ends [`Supervisor::run`] with [`Exit::Restart`]. The owner
//! then tears down and rebuilds the whole gateway.

use std::time::Duration;

use pressgate_core::config::SupervisorConfig;
use pressgate_core::{enabled_workers, next_state, Notification, SystemState, WorkerSet};
use tokio::sync::Mutex;

use crate::bus::NotificationBus;
use crate::control::{WorkerControl, WorkerHandle};
use crate::RuntimeError;

/// Why [`Supervisor::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The device reached `Error`; rebuild everything
    Restart,
}

/// Owner of the device state and the worker table
#[derive(Debug)]
pub struct Supervisor {
    state: Mutex<SystemState>,
    config: SupervisorConfig,
    bus: NotificationBus,
    control: WorkerControl,
}

impl Supervisor {
    /// Supervisor starting in `Connecting`
    pub fn new(config: SupervisorConfig, bus: NotificationBus) -> Result<Self, RuntimeError> {
        config.validate()?;

        let control = WorkerControl::new();
        control.apply(enabled_workers(SystemState::Connecting));

        Ok(Self {
            state: Mutex::new(SystemState::Connecting),
            config,
            bus,
            control,
        })
    }

    /// Notification bus this supervisor listens on
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Enable handle for `worker`
    pub fn handle(&self, worker: pressgate_core::Worker) -> WorkerHandle {
        self.control.handle(worker)
    }

    /// Workers enabled right now
    pub fn enabled(&self) -> WorkerSet {
        self.control.enabled()
    }

    fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.config.lock_timeout_ms)
    }

    /// Current state, waiting at most the lock timeout
    pub async fn get_state(&self) -> Result<SystemState, RuntimeError> {
        match tokio::time::timeout(self.lock_timeout(), self.state.lock()).await {
            Ok(guard) => Ok(*guard),
            Err(_) => Err(RuntimeError::StateLockTimeout(self.config.lock_timeout_ms)),
        }
    }

    /// Overwrite the state, waiting at most the lock timeout
    pub async fn set_state(&self, state: SystemState) -> Result<(), RuntimeError> {
        match tokio::time::timeout(self.lock_timeout(), self.state.lock()).await {
            Ok(mut guard) => {
                *guard = state;
                Ok(())
            }
            Err(_) => Err(RuntimeError::StateLockTimeout(self.config.lock_timeout_ms)),
        }
    }

    /// Fold `notification` into the state and apply the worker table
    ///
    /// If the state lock times out the bits go back on the bus, so the
    /// delivery is retried on the next tick instead of being lost.
    pub async fn apply(&self, notification: Notification) -> Result<SystemState, RuntimeError> {
        let next = {
            let lock = tokio::time::timeout(self.lock_timeout(), self.state.lock());
            let mut guard = match lock.await {
                Ok(guard) => guard,
                Err(_) => {
                    self.bus.post(notification);
                    return Err(RuntimeError::StateLockTimeout(self.config.lock_timeout_ms));
                }
            };

            if notification.contains(Notification::QUEUE_FULL) {
                log::warn!("a bounded channel started dropping");
            }
            if notification.contains(Notification::BUS_ERROR_RECOVERED) {
                log::info!("sensor bus reinitialized");
            }

            let current = *guard;
            let next = next_state(current, notification);
            if next != current {
                log::info!("{} -> {} on {:?}", current, next, notification);
                *guard = next;
            }
            next
        };

        if self.control.apply(enabled_workers(next)) {
            log::debug!("workers now {:?}", self.control.enabled());
        }
        Ok(next)
    }

    /// One supervisor tick: wait for a delivery, then [`Self::apply`] it
    pub async fn step(&self) -> Result<SystemState, RuntimeError> {
        let wait = Duration::from_millis(self.config.notification_wait_ms);
        let notification = self.bus.wait(wait).await;
        self.apply(notification).await
    }

    /// Tick until the device reaches `Error`, then restart after the grace period
    pub async fn run(&self) -> Exit {
        let tick = Duration::from_millis(self.config.tick_interval_ms);

        loop {
            match self.step().await {
                Ok(SystemState::Error) => break,
                Ok(_) => {}
                Err(e) => log::error!("supervisor tick skipped: {}", e),
            }
            tokio::time::sleep(tick).await;
        }

        self.control.apply(WorkerSet::EMPTY);
        log::error!(
            "entered ERROR, restarting in {} ms",
            self.config.error_restart_delay_ms
        );
        tokio::time::sleep(Duration::from_millis(self.config.error_restart_delay_ms)).await;
        Exit::Restart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_core::Worker;

    fn supervisor() -> Supervisor {
        Supervisor::new(SupervisorConfig::default(), NotificationBus::new()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn starts_connecting_with_wifi_worker() {
        let sup = supervisor();
        assert_eq!(sup.get_state().await.unwrap(), SystemState::Connecting);
        assert!(sup.enabled().contains(Worker::WifiConnect));
        assert!(!sup.enabled().contains(Worker::Reader));
    }

    #[tokio::test(start_paused = true)]
    async fn step_follows_posted_bits() {
        let sup = supervisor();
        sup.bus().post(Notification::WIFI_CONNECTED);
        assert_eq!(sup.step().await.unwrap(), SystemState::ConfigMqtt);

        // Nothing posted: the tick times out and the state holds
        assert_eq!(sup.step().await.unwrap(), SystemState::ConfigMqtt);
        assert!(sup.enabled().contains(Worker::TransportConnect));
    }

    #[tokio::test(start_paused = true)]
    async fn held_lock_times_out() {
        let sup = supervisor();
        let _guard = sup.state.lock().await;

        assert!(matches!(
            sup.get_state().await,
            Err(RuntimeError::StateLockTimeout(100))
        ));
        assert!(sup.set_state(SystemState::ConfigMode).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn lock_timeout_keeps_delivery_for_next_tick() {
        let sup = supervisor();
        let guard = sup.state.lock().await;

        sup.bus().post(Notification::WIFI_CONNECTED);
        assert!(matches!(sup.step().await, Err(RuntimeError::StateLockTimeout(_))));
        assert_eq!(sup.bus().pending(), Notification::WIFI_CONNECTED);

        drop(guard);
        assert_eq!(sup.step().await.unwrap(), SystemState::ConfigMqtt);
        assert!(sup.bus().pending().is_empty());
    }

    #[test]
    fn rejects_zero_lock_timeout() {
        let config = SupervisorConfig { lock_timeout_ms: 0, ..SupervisorConfig::default() };
        assert!(matches!(
            Supervisor::new(config, NotificationBus::new()),
            Err(RuntimeError::Config(_))
        ));
    }
}
