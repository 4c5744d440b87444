//! Cascaded Exponential Smoothing
//!
//! Two EMA stages in series: a reactive primary stage (α₁) feeding a smooth
//! secondary stage (α₂).
//!
//! ```text
//! p' = α₁·raw + (1 − α₁)·p
//! s' = α₂·p'  + (1 − α₂)·s
//! ```
//!
//! The first sample seeds both stages to itself, so there is no start-up
//! transient. Each stage is a convex combination of its inputs, so the
//! output never leaves the range of the raw values seen so far.

use crate::config::SignalConfig;

/// Two-stage EMA over one scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalFilter {
    alpha_primary: f32,
    alpha_secondary: f32,
    primary: f32,
    secondary: f32,
    initialized: bool,
}

impl SignalFilter {
    /// Filter with explicit factors, both in `(0, 1]`
    pub const fn new(alpha_primary: f32, alpha_secondary: f32) -> Self {
        Self {
            alpha_primary,
            alpha_secondary,
            primary: 0.0,
            secondary: 0.0,
            initialized: false,
        }
    }

    /// Filter using the factors of `config`
    pub const fn from_config(config: &SignalConfig) -> Self {
        Self::new(config.alpha_primary, config.alpha_secondary)
    }

    /// Feed one raw value and return the secondary output
    pub fn filter(&mut self, raw: f32) -> f32 {
        if !self.initialized {
            self.primary = raw;
            self.secondary = raw;
            self.initialized = true;
            return raw;
        }

        self.primary = self.alpha_primary * raw + (1.0 - self.alpha_primary) * self.primary;
        self.secondary =
            self.alpha_secondary * self.primary + (1.0 - self.alpha_secondary) * self.secondary;
        self.secondary
    }

    /// Current output, `None` before the first sample
    pub fn value(&self) -> Option<f32> {
        self.initialized.then_some(self.secondary)
    }

    /// Current primary stage output, `None` before the first sample
    pub fn primary(&self) -> Option<f32> {
        self.initialized.then_some(self.primary)
    }

    /// True once seeded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget history; the next sample re-seeds both stages
    pub fn reset(&mut self) {
        self.initialized = false;
        self.primary = 0.0;
        self.secondary = 0.0;
    }
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self::from_config(&SignalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_sample_seeds_both_stages() {
        let mut filter = SignalFilter::new(0.1, 0.05);
        assert_eq!(filter.value(), None);

        assert_eq!(filter.filter(3_450_000.0), 3_450_000.0);
        assert_eq!(filter.primary(), Some(3_450_000.0));
        assert_eq!(filter.value(), Some(3_450_000.0));
    }

    #[test]
    fn step_response_lags() {
        let mut filter = SignalFilter::new(0.5, 0.5);
        filter.filter(0.0);

        // p = 50, s = 25
        let out = filter.filter(100.0);
        assert!((out - 25.0).abs() < 1e-4);
        assert!((filter.primary().unwrap_or_default() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn unity_factors_pass_through() {
        let mut filter = SignalFilter::new(1.0, 1.0);
        filter.filter(10.0);
        assert_eq!(filter.filter(42.0), 42.0);
    }

    #[test]
    fn reset_reseeds() {
        let mut filter = SignalFilter::default();
        filter.filter(100.0);
        filter.filter(200.0);
        filter.reset();

        assert!(!filter.is_initialized());
        assert_eq!(filter.filter(500.0), 500.0);
    }

    proptest! {
        #[test]
        fn output_stays_within_input_range(
            alpha_primary in 0.01f32..=1.0,
            alpha_secondary in 0.01f32..=1.0,
            raws in prop::collection::vec(10_000u32..16_000_000, 1..200),
        ) {
            let mut filter = SignalFilter::new(alpha_primary, alpha_secondary);
            let mut lo = f32::MAX;
            let mut hi = f32::MIN;

            for raw in raws {
                let raw = raw as f32;
                lo = lo.min(raw);
                hi = hi.max(raw);

                let out = filter.filter(raw);
                // f32 spacing near 16M is one count; allow a few roundings
                let slack = 8.0;
                prop_assert!(out >= lo - slack && out <= hi + slack, "{out} outside [{lo}, {hi}]");
            }
        }
    }
}
