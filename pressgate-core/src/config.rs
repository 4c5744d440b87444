//! Runtime configuration
//!
//! Each struct defaults to the compile-time constants and is checked once,
//! at construction of the stage that consumes it. Storage capacities are
//! const generics and do not appear here.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{sampling, signal, supervisor, transport};
use crate::errors::ConfigError;

/// Parameters of the filter → derivative → state machine → accumulator path
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SignalConfig {
    /// Primary (fast) EMA factor α₁
    pub alpha_primary: f32,
    /// Secondary (slow) EMA factor α₂
    pub alpha_secondary: f32,
    /// EMA factor applied to the window derivative
    pub derivative_alpha: f32,
    /// |derivative| above which a changing interval opens (units/s)
    pub threshold_high: f32,
    /// Fraction of `threshold_high` the derivative must drop below to close
    pub hysteresis: f32,
    /// Minimum time in the changing state
    pub min_changing_dwell_ms: u64,
    /// Stable summary duration floor
    pub min_stable_duration_ms: u64,
    /// Stable summary sample floor
    pub min_stable_samples: u32,
    /// Stable runs are closed after this long regardless of count
    pub max_stable_duration_ms: u64,
    /// Changing intervals are closed after this long
    pub max_changing_duration_ms: u64,
    /// Changing intervals are closed after this many samples
    ///
    /// Samples beyond the detail capacity are still counted but not stored.
    pub max_changing_samples: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            alpha_primary: signal::FILTER_ALPHA_PRIMARY,
            alpha_secondary: signal::FILTER_ALPHA_SECONDARY,
            derivative_alpha: signal::DERIVATIVE_FILTER_ALPHA,
            threshold_high: signal::DERIVATIVE_THRESHOLD,
            hysteresis: signal::HYSTERESIS_FACTOR,
            min_changing_dwell_ms: signal::MIN_CHANGING_DWELL_MS,
            min_stable_duration_ms: signal::MIN_STABLE_DURATION_MS,
            min_stable_samples: signal::MIN_STABLE_SAMPLES,
            max_stable_duration_ms: signal::MAX_STABLE_DURATION_MS,
            max_changing_duration_ms: signal::MAX_CHANGING_DURATION_MS,
            max_changing_samples: signal::MAX_SAMPLES_PER_EVENT as u32,
        }
    }
}

impl SignalConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_alpha("alpha_primary", self.alpha_primary)?;
        check_alpha("alpha_secondary", self.alpha_secondary)?;
        check_alpha("derivative_alpha", self.derivative_alpha)?;

        if !(self.threshold_high.is_finite() && self.threshold_high > 0.0) {
            return Err(ConfigError::NonPositiveThreshold { name: "threshold_high" });
        }
        if !(self.hysteresis > 0.0 && self.hysteresis < 1.0) {
            return Err(ConfigError::InvalidHysteresis(self.hysteresis));
        }
        if self.max_stable_duration_ms == 0 {
            return Err(ConfigError::Zero { name: "max_stable_duration_ms" });
        }
        if self.max_changing_duration_ms == 0 {
            return Err(ConfigError::Zero { name: "max_changing_duration_ms" });
        }
        if self.max_changing_samples == 0 {
            return Err(ConfigError::Zero { name: "max_changing_samples" });
        }

        Ok(())
    }

    /// Derivative magnitude a changing interval must fall under to close
    pub fn threshold_low(&self) -> f32 {
        self.threshold_high * self.hysteresis
    }
}

fn check_alpha(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSmoothing { name, value })
    }
}

/// Parameters of reading validation and bus fault recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationConfig {
    /// Exclusive lower bound of a plausible raw count
    pub raw_min: u32,
    /// Exclusive upper bound of a plausible raw count
    pub raw_max: u32,
    /// Largest accepted step from the baseline
    pub max_step: u32,
    /// Consecutive rejects that re-anchor the baseline
    pub invalid_reset_threshold: u32,
    /// Consecutive bus faults that trigger bus reinitialization
    pub bus_fault_threshold: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            raw_min: sampling::RAW_VALUE_MIN,
            raw_max: sampling::RAW_VALUE_MAX,
            max_step: sampling::MAX_SAMPLE_STEP,
            invalid_reset_threshold: sampling::INVALID_RESET_THRESHOLD,
            bus_fault_threshold: sampling::BUS_FAULT_REINIT_THRESHOLD,
        }
    }
}

impl ValidationConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.raw_max <= self.raw_min.saturating_add(1) {
            return Err(ConfigError::EmptyRange { min: self.raw_min, max: self.raw_max });
        }
        if self.invalid_reset_threshold == 0 {
            return Err(ConfigError::Zero { name: "invalid_reset_threshold" });
        }
        if self.bus_fault_threshold == 0 {
            return Err(ConfigError::Zero { name: "bus_fault_threshold" });
        }
        Ok(())
    }
}

/// Flush policy of the message batcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchConfig {
    /// Partial batches are flushed after this long; `None` never flushes on time
    pub flush_timeout_ms: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_timeout_ms: Some(transport::FLUSH_TIMEOUT_MS),
        }
    }
}

/// Timing of the device supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SupervisorConfig {
    /// Longest wait for a notification per tick
    pub notification_wait_ms: u64,
    /// Pause between ticks
    pub tick_interval_ms: u64,
    /// Bounded wait for the device state lock
    pub lock_timeout_ms: u64,
    /// Delay between entering the error state and restarting
    pub error_restart_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            notification_wait_ms: supervisor::NOTIFICATION_WAIT_MS,
            tick_interval_ms: supervisor::SUPERVISOR_TICK_MS,
            lock_timeout_ms: supervisor::STATE_LOCK_TIMEOUT_MS,
            error_restart_delay_ms: supervisor::ERROR_RESTART_DELAY_MS,
        }
    }
}

impl SupervisorConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Zero { name: "lock_timeout_ms" });
        }
        if self.notification_wait_ms == 0 {
            return Err(ConfigError::Zero { name: "notification_wait_ms" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SignalConfig::default().validate().is_ok());
        assert!(ValidationConfig::default().validate().is_ok());
        assert!(SupervisorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_smoothing() {
        let config = SignalConfig { alpha_primary: 0.0, ..SignalConfig::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSmoothing { name: "alpha_primary", value: 0.0 })
        );

        let config = SignalConfig { derivative_alpha: 1.5, ..SignalConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_hysteresis_without_gap() {
        let config = SignalConfig { hysteresis: 1.0, ..SignalConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::InvalidHysteresis(1.0)));
    }

    #[test]
    fn rejects_empty_raw_range() {
        let config = ValidationConfig { raw_min: 100, raw_max: 101, ..ValidationConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::EmptyRange { min: 100, max: 101 }));
    }

    #[test]
    fn low_threshold_applies_hysteresis() {
        let config =
            SignalConfig { threshold_high: 1000.0, hysteresis: 0.8, ..SignalConfig::default() };
        assert!((config.threshold_low() - 800.0).abs() < 1e-3);
    }
}
