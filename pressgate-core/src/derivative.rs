//! Window Derivative Estimation
//!
//! The rate of change is taken across the whole window rather than between
//! adjacent samples, which averages out sample-to-sample noise:
//!
//! ```text
//! rate = (newest.value − oldest.value) × 1000 / (newest.ts − oldest.ts)
//! ```
//!
//! The raw rate then passes through a single EMA so one outlier sample
//! cannot flip the state machine. The smoothed rate starts at zero.

use crate::buffer::RingBuffer;
use crate::config::SignalConfig;
use crate::constants::DERIVATIVE_WINDOW_SIZE;
use crate::time::{elapsed_ms, rate_per_second, Timestamp};

/// One filtered value in the derivative window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSample {
    /// Filtered value
    pub value: f32,
    /// Sample time
    pub timestamp: Timestamp,
}

/// Sliding-window derivative with EMA smoothing
///
/// `W` is the window length in samples and must be at least 2.
#[derive(Debug, Clone)]
pub struct DerivativeEstimator<const W: usize = DERIVATIVE_WINDOW_SIZE> {
    window: RingBuffer<WindowSample, W>,
    alpha: f32,
    smoothed: f32,
}

impl<const W: usize> DerivativeEstimator<W> {
    const WINDOW_HOLDS_TWO: () = assert!(W >= 2, "derivative window needs at least two samples");

    /// Estimator with smoothing factor `alpha` in `(0, 1]`
    pub fn new(alpha: f32) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WINDOW_HOLDS_TWO;

        Self {
            window: RingBuffer::new(),
            alpha,
            smoothed: 0.0,
        }
    }

    /// Estimator using the derivative factor of `config`
    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(config.derivative_alpha)
    }

    /// Add a filtered sample to the window
    pub fn push(&mut self, value: f32, timestamp: Timestamp) {
        self.window.push(WindowSample { value, timestamp });
    }

    /// Raw window rate in units per second
    ///
    /// Zero with fewer than two samples or when oldest and newest share a
    /// timestamp.
    pub fn estimate(&self) -> f32 {
        if self.window.len() < 2 {
            return 0.0;
        }

        match (self.window.oldest(), self.window.newest()) {
            (Some(oldest), Some(newest)) => rate_per_second(
                newest.value - oldest.value,
                elapsed_ms(oldest.timestamp, newest.timestamp),
            ),
            _ => 0.0,
        }
    }

    /// Push a sample and return the updated smoothed rate
    pub fn update(&mut self, value: f32, timestamp: Timestamp) -> f32 {
        self.push(value, timestamp);
        let raw = self.estimate();
        self.smoothed = self.alpha * raw + (1.0 - self.alpha) * self.smoothed;
        self.smoothed
    }

    /// Last smoothed rate
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Samples currently in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop the window and the smoothed rate
    pub fn reset(&mut self) {
        self.window.clear();
        self.smoothed = 0.0;
    }
}

impl Default for DerivativeEstimator {
    fn default() -> Self {
        Self::from_config(&SignalConfig::default())
    }
}
