//! Error Types for the Signal Path
//!
//! ## Design Philosophy
//!
//! Errors in the core are returned from the hot path of a device that may
//! have no heap, so every error here is:
//!
//! 1. **Small**: a few bytes of inline data, no `String`.
//! 2. **Copy**: cheap to return and to stash in statistics.
//! 3. **Non-fatal**: nothing in this module ever stops the pipeline. A
//!    rejected reading is counted, a rejected batch is counted, and the
//!    stage moves on.
//!
//! ## Error Categories
//!
//! ### Reading Rejections ([`ValidationError`])
//! - `OutOfRange`: raw count outside the transducer's plausible window
//! - `StepExceeded`: jump from the last accepted count is physically implausible
//! - `BusFault`: the sensor bus did not deliver a sample
//!
//! ### Configuration Mistakes ([`ConfigError`])
//! Raised once at construction; a pipeline never starts with parameters
//! that would make the filter or state machine meaningless.
//!
//! ### Batch Rejections ([`EncodeError`])
//! The batch could not be turned into a message that fits the transport.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use pressgate_core::{ReadingValidator, ValidationError};
//! use pressgate_core::config::ValidationConfig;
//!
//! let mut validator = ReadingValidator::new(ValidationConfig::default());
//! match validator.validate(3_450_000) {
//!     Ok(value) => { /* feed the pipeline */ let _ = value; }
//!     Err(ValidationError::StepExceeded { .. }) => { /* spike, counted */ }
//!     Err(_) => { /* sensor fault, counted */ }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for reading validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reasons a raw reading is not admitted to the signal path
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Raw count outside the open interval `(min, max)`
    #[error("Raw value {value} outside range ({min}, {max})")]
    OutOfRange {
        /// The rejected raw count
        value: u32,
        /// Exclusive lower bound
        min: u32,
        /// Exclusive upper bound
        max: u32,
    },

    /// Jump from the validation baseline is larger than physically possible
    #[error("Step {step} exceeds plausibility bound {max_step}")]
    StepExceeded {
        /// Absolute difference from the baseline
        step: u32,
        /// Configured bound
        max_step: u32,
    },

    /// Sensor bus timed out or returned a short read
    #[error("Sensor bus fault")]
    BusFault,
}

/// Invalid runtime configuration
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A smoothing factor is outside `(0, 1]`
    #[error("Smoothing factor {name} = {value} outside (0, 1]")]
    InvalidSmoothing {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// Hysteresis factor must leave a gap under the entry threshold
    #[error("Hysteresis factor {0} outside (0, 1)")]
    InvalidHysteresis(f32),

    /// A threshold is zero, negative or not a number
    #[error("Threshold {name} must be positive")]
    NonPositiveThreshold {
        /// Parameter name
        name: &'static str,
    },

    /// A count or duration that must be non-zero is zero
    #[error("{name} must be greater than zero")]
    Zero {
        /// Parameter name
        name: &'static str,
    },

    /// Raw value window contains no admissible value
    #[error("Raw range ({min}, {max}) is empty")]
    EmptyRange {
        /// Exclusive lower bound
        min: u32,
        /// Exclusive upper bound
        max: u32,
    },
}

/// Reasons a batch could not be turned into an outbound message
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload still exceeds the transport limit after dropping detail
    #[error("Payload of {size} bytes exceeds limit {limit}")]
    PayloadTooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Transport limit in bytes
        limit: usize,
    },

    /// Serializer reported an error
    #[error("Serialization failed")]
    Serialization,

    /// Nothing to encode
    #[error("Empty batch")]
    EmptyBatch,
}
