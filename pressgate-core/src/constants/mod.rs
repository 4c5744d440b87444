//! Constants for Pressgate Core
//!
//! Every tunable that shapes the signal path lives here, with a note on
//! where the value comes from. Runtime configuration structs in
//! [`crate::config`] take their defaults from these values.
//!
//! ## Organization
//!
//! - **Sampling**: acquisition rate and raw value plausibility limits
//! - **Signal**: filter coefficients, derivative thresholds, interval floors
//! - **Buffers**: channel and batch capacities
//! - **Transport**: payload limits, flush timing, topic layout
//! - **Supervisor**: notification polling and restart timing
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Capacities that size storage are consumed as const generic defaults
//! 3. Durations are milliseconds unless the name says otherwise

/// Acquisition rate and raw value limits.
pub mod sampling;

/// Filter, derivative and interval parameters.
pub mod signal;

/// Channel and batch capacities.
pub mod buffers;

/// Payload sizing, flush timing and topics.
pub mod transport;

/// Supervisor timing.
pub mod supervisor;

pub use sampling::{
    SAMPLE_RATE_HZ, SAMPLE_INTERVAL_MS, RAW_VALUE_MIN, RAW_VALUE_MAX,
    MAX_SAMPLE_STEP, INVALID_RESET_THRESHOLD, BUS_FAULT_REINIT_THRESHOLD,
};

pub use signal::{
    FILTER_ALPHA_PRIMARY, FILTER_ALPHA_SECONDARY, DERIVATIVE_WINDOW_SIZE,
    DERIVATIVE_FILTER_ALPHA, DERIVATIVE_THRESHOLD, HYSTERESIS_FACTOR,
    MAX_SAMPLES_PER_EVENT,
};

pub use buffers::{
    READING_QUEUE_SIZE, EVENT_QUEUE_SIZE, OUTBOUND_QUEUE_SIZE,
    PULSE_QUEUE_SIZE, MAX_EVENTS_PER_MESSAGE,
};

pub use transport::{
    MAX_PAYLOAD_SIZE, FLUSH_TIMEOUT_MS, SAMPLES_JSON_CAP, STATS_LOG_INTERVAL_MS,
};
