//! Signal Path Parameters
//!
//! Tuned for water-line pressure at 10 Hz, where a tap opening or closing
//! shows up as a ramp lasting a few hundred milliseconds to a few seconds.

// ===== FILTERING =====

/// Primary (fast) smoothing factor of the cascaded filter.
pub const FILTER_ALPHA_PRIMARY: f32 = 0.1;

/// Secondary (slow) smoothing factor of the cascaded filter.
pub const FILTER_ALPHA_SECONDARY: f32 = 0.05;

// ===== DERIVATIVE =====

/// Samples held by the derivative window (5 s at 10 Hz).
pub const DERIVATIVE_WINDOW_SIZE: usize = 50;

/// Smoothing factor applied to the raw window derivative.
pub const DERIVATIVE_FILTER_ALPHA: f32 = 0.1;

/// Derivative magnitude (counts per second) that opens a changing interval.
pub const DERIVATIVE_THRESHOLD: f32 = 12_000.0;

/// Fraction of [`DERIVATIVE_THRESHOLD`] the derivative must fall below
/// before a changing interval may close.
pub const HYSTERESIS_FACTOR: f32 = 0.8;

/// Minimum time spent in the changing state before returning to stable.
pub const MIN_CHANGING_DWELL_MS: u64 = 500;

/// Fraction of [`DERIVATIVE_THRESHOLD`] under which a finalized changing
/// interval is labelled stable-like.
pub const STABLE_CLASSIFICATION_FACTOR: f32 = 0.3;

// ===== INTERVALS =====

/// Minimum duration of an emitted stable summary.
pub const MIN_STABLE_DURATION_MS: u64 = 5_000;

/// Minimum samples in an emitted stable summary.
pub const MIN_STABLE_SAMPLES: u32 = 50;

/// A stable run is always closed after this long, even if flat.
pub const MAX_STABLE_DURATION_MS: u64 = 60_000;

/// A changing interval is always closed after this long.
pub const MAX_CHANGING_DURATION_MS: u64 = 30_000;

/// Detail capacity of a changing event (stored samples).
pub const MAX_SAMPLES_PER_EVENT: usize = 50;
