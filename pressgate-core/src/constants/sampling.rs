//! Sampling Rate and Raw Value Limits
//!
//! The pressure transducer is read through a 24-bit ADC. Values are raw
//! counts, never converted to engineering units on the device.

/// Fixed acquisition rate of the reader.
pub const SAMPLE_RATE_HZ: u32 = 10;

/// Interval between two reader ticks.
pub const SAMPLE_INTERVAL_MS: u64 = 1000 / SAMPLE_RATE_HZ as u64;

/// Lower plausibility bound (exclusive).
///
/// Readings at or below this are a disconnected or shorted transducer.
pub const RAW_VALUE_MIN: u32 = 10_000;

/// Upper plausibility bound (exclusive).
///
/// The ADC saturates just under 2^24; anything near full scale is a fault.
pub const RAW_VALUE_MAX: u32 = 16_000_000;

/// Largest accepted step between two consecutive accepted samples.
///
/// Calibrated as 300,000 counts per sample at 100 Hz and scaled linearly
/// with the configured rate.
pub const MAX_SAMPLE_STEP: u32 = 300_000 * SAMPLE_RATE_HZ / 100;

/// Consecutive rejected samples after which the validation baseline is
/// discarded and the next in-range sample is accepted unconditionally.
pub const INVALID_RESET_THRESHOLD: u32 = 10;

/// Consecutive bus faults after which the sensor bus is reinitialized.
pub const BUS_FAULT_REINIT_THRESHOLD: u32 = 5;

/// Silence after which an open pulse group is closed.
pub const PULSE_INACTIVITY_TIMEOUT_MS: u64 = 2_000;
