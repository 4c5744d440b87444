//! Supervisor Timing

/// Longest wait for a notification delivery in one supervisor tick.
pub const NOTIFICATION_WAIT_MS: u64 = 50;

/// Pause between supervisor ticks.
pub const SUPERVISOR_TICK_MS: u64 = 100;

/// Bounded wait for the device state lock.
pub const STATE_LOCK_TIMEOUT_MS: u64 = 100;

/// Grace period between entering the error state and restarting.
pub const ERROR_RESTART_DELAY_MS: u64 = 5_000;
