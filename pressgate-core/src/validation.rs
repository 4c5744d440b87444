//! Raw Reading Validation
//!
//! Two checks run on every raw count before it may enter the signal path:
//!
//! 1. **Range**: `raw_min < raw < raw_max`, both bounds exclusive. Values at
//!    the rails are a disconnected or saturated transducer.
//! 2. **Plausibility step**: `|raw − baseline| ≤ max_step`, where the
//!    baseline is the last accepted value. Pressure in a pipe cannot jump
//!    further than that in one sample period.
//!
//! ## Baseline Reset
//!
//! A legitimate large jump (valve slammed, sensor swapped) would be rejected
//! forever against a stale baseline. After `invalid_reset_threshold`
//! consecutive rejects the stale baseline is abandoned:
//!
//! - if the latest reject was in range (a step reject), the baseline is
//!   force-accepted at that latest value and later readings are checked
//!   against the new level;
//! - if it was out of range, there is no usable level, so the baseline is
//!   cleared and the next in-range value is accepted unconditionally.

use crate::config::ValidationConfig;
use crate::errors::{ValidationError, ValidationResult};

/// Validator counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    /// Accepted values
    pub accepted: u32,
    /// Rejected by the range check
    pub out_of_range: u32,
    /// Rejected by the step check
    pub step_exceeded: u32,
    /// Baselines re-anchored or cleared after a reject streak
    pub baseline_resets: u32,
}

/// Range and step checker with a self-healing baseline
#[derive(Debug, Clone)]
pub struct ReadingValidator {
    config: ValidationConfig,
    baseline: Option<u32>,
    consecutive_rejects: u32,
    stats: ValidationStats,
}

impl ReadingValidator {
    /// Validator with no baseline yet
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            baseline: None,
            consecutive_rejects: 0,
            stats: ValidationStats::default(),
        }
    }

    /// Check `raw`; on success it becomes the new baseline
    pub fn validate(&mut self, raw: u32) -> ValidationResult<u32> {
        match self.check(raw) {
            Ok(value) => {
                self.baseline = Some(value);
                self.consecutive_rejects = 0;
                self.stats.accepted = self.stats.accepted.wrapping_add(1);
                Ok(value)
            }
            Err(err) => {
                let latest_in_range = match err {
                    ValidationError::OutOfRange { .. } => {
                        self.stats.out_of_range += 1;
                        None
                    }
                    ValidationError::StepExceeded { .. } => {
                        self.stats.step_exceeded += 1;
                        Some(raw)
                    }
                    ValidationError::BusFault => None,
                };
                self.record_reject(latest_in_range);
                Err(err)
            }
        }
    }

    fn check(&self, raw: u32) -> ValidationResult<u32> {
        if raw <= self.config.raw_min || raw >= self.config.raw_max {
            return Err(ValidationError::OutOfRange {
                value: raw,
                min: self.config.raw_min,
                max: self.config.raw_max,
            });
        }

        if let Some(baseline) = self.baseline {
            let step = raw.abs_diff(baseline);
            if step > self.config.max_step {
                return Err(ValidationError::StepExceeded {
                    step,
                    max_step: self.config.max_step,
                });
            }
        }

        Ok(raw)
    }

    fn record_reject(&mut self, latest_in_range: Option<u32>) {
        self.consecutive_rejects += 1;

        if self.consecutive_rejects >= self.config.invalid_reset_threshold {
            log_warn!(
                "{} consecutive invalid readings, re-anchoring validation baseline at {:?}",
                self.consecutive_rejects,
                latest_in_range
            );
            self.baseline = latest_in_range;
            self.consecutive_rejects = 0;
            self.stats.baseline_resets += 1;
        }
    }

    /// Forget the baseline; the next in-range value is accepted
    pub fn reset_baseline(&mut self) {
        self.baseline = None;
        self.consecutive_rejects = 0;
    }

    /// Last accepted value
    pub fn baseline(&self) -> Option<u32> {
        self.baseline
    }

    /// Rejects since the last accepted value or reset
    pub fn consecutive_rejects(&self) -> u32 {
        self.consecutive_rejects
    }

    /// Counters
    pub fn stats(&self) -> ValidationStats {
        self.stats
    }
}

impl Default for ReadingValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
