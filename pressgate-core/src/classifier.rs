//! Changing-interval classification
//!
//! Applied once, when a changing interval closes. The order of the rules
//! matters and determines the payload shape downstream:
//!
//! 1. `|mean derivative| < T_high × 0.3` → stable-like
//! 2. net change and mean derivative both positive → rising
//! 3. both negative → falling
//! 4. anything else (overshoot and return) → oscillation

use crate::constants::signal::STABLE_CLASSIFICATION_FACTOR;
use crate::events::{EventKind, ProcessedSample};

/// Mean of the per-sample derivatives
///
/// Needs at least two samples; a single sample says nothing about the
/// interval as a whole and yields 0.
pub fn mean_derivative(samples: &[ProcessedSample]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|s| s.derivative).sum();
    sum / samples.len() as f32
}

/// Label an interval from its mean derivative and net value change
pub fn classify(mean_derivative: f32, net_change: i64, threshold_high: f32) -> EventKind {
    if libm::fabsf(mean_derivative) < threshold_high * STABLE_CLASSIFICATION_FACTOR {
        EventKind::Stable
    } else if net_change > 0 && mean_derivative > 0.0 {
        EventKind::Rising
    } else if net_change < 0 && mean_derivative < 0.0 {
        EventKind::Falling
    } else {
        EventKind::Oscillation
    }
}
