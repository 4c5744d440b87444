//! Interval Accumulators
//!
//! ## Overview
//!
//! While the state machine is STABLE, samples feed a [`StableAccumulator`]
//! that only keeps running statistics. While it is CHANGING, samples feed a
//! [`ChangingBuilder`] that also keeps a bounded array of detail samples.
//!
//! ## Finalize Policies
//!
//! | Accumulator | Closes when |
//! |-------------|-------------|
//! | Stable | (elapsed ≥ min duration **and** count ≥ floor) **or** elapsed ≥ max duration |
//! | Changing | count ≥ sample cap **or** elapsed ≥ max duration |
//!
//! Either one is also closed by the pipeline when the state machine leaves
//! its state. Closing an empty accumulator yields nothing.
//!
//! A changing interval closed by its own caps while the signal is still
//! changing is split. The interval that follows latches its trigger from the
//! derivative sign of its own first sample, like any other.
//!
//! ## Detail Capacity
//!
//! A changing interval stores at most `M` samples ([`MAX_SAMPLES_PER_EVENT`]
//! by default). When the configured sample cap is larger, later samples
//! still extend the end timestamp, end value and count, but are not stored.

use heapless::Vec;

use crate::classifier::{classify, mean_derivative};
use crate::config::SignalConfig;
use crate::constants::MAX_SAMPLES_PER_EVENT;
use crate::events::{ChangingEvent, ProcessedSample, StableSummary, TriggerReason};
use crate::time::{elapsed_ms, Timestamp};

/// Running statistics of a flat run
#[derive(Debug, Clone)]
pub struct StableAccumulator {
    min: u32,
    max: u32,
    sum: u64,
    count: u32,
    period_start: Timestamp,
    last_timestamp: Timestamp,
    min_duration_ms: u64,
    min_samples: u32,
    max_duration_ms: u64,
}

impl StableAccumulator {
    /// Empty accumulator with the stable floors of `config`
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            min: 0,
            max: 0,
            sum: 0,
            count: 0,
            period_start: 0,
            last_timestamp: 0,
            min_duration_ms: config.min_stable_duration_ms,
            min_samples: config.min_stable_samples,
            max_duration_ms: config.max_stable_duration_ms,
        }
    }

    /// Add a sample; returns true when the run should be finalized
    pub fn add(&mut self, value: u32, timestamp: Timestamp) -> bool {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.period_start = timestamp;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.sum += u64::from(value);
        self.count += 1;
        self.last_timestamp = timestamp;

        self.should_finalize(timestamp)
    }

    /// Finalize policy evaluated at `now`
    pub fn should_finalize(&self, now: Timestamp) -> bool {
        if self.count == 0 {
            return false;
        }

        let elapsed = elapsed_ms(self.period_start, now);
        (elapsed >= self.min_duration_ms && self.count >= self.min_samples)
            || elapsed >= self.max_duration_ms
    }

    /// Emit the summary and reset; `None` if empty
    pub fn finalize(&mut self) -> Option<StableSummary> {
        if self.count == 0 {
            return None;
        }

        let summary = StableSummary {
            start_timestamp: self.period_start,
            end_timestamp: self.last_timestamp,
            sample_count: self.count,
            average: (self.sum / u64::from(self.count)) as u32,
            min: self.min,
            max: self.max,
        };

        self.reset();
        Some(summary)
    }

    /// Discard the current run
    pub fn reset(&mut self) {
        self.min = 0;
        self.max = 0;
        self.sum = 0;
        self.count = 0;
    }

    /// Samples in the current run
    pub fn count(&self) -> u32 {
        self.count
    }

    /// True if no sample since the last reset
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Builder of a changing interval
///
/// `M` is the detail capacity.
#[derive(Debug, Clone)]
pub struct ChangingBuilder<const M: usize = MAX_SAMPLES_PER_EVENT> {
    start_timestamp: Timestamp,
    end_timestamp: Timestamp,
    start_value: u32,
    end_value: u32,
    sample_count: u32,
    samples: Vec<ProcessedSample, M>,
    trigger: TriggerReason,
    max_samples: u32,
    max_duration_ms: u64,
    threshold_high: f32,
}

impl<const M: usize> ChangingBuilder<M> {
    /// Empty builder with the changing caps of `config`
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            start_timestamp: 0,
            end_timestamp: 0,
            start_value: 0,
            end_value: 0,
            sample_count: 0,
            samples: Vec::new(),
            trigger: TriggerReason::DerivativeRising,
            max_samples: config.max_changing_samples,
            max_duration_ms: config.max_changing_duration_ms,
            threshold_high: config.threshold_high,
        }
    }

    /// Add a sample; returns true when the interval should be finalized
    pub fn add(&mut self, sample: ProcessedSample) -> bool {
        if self.sample_count == 0 {
            self.start_timestamp = sample.timestamp;
            self.start_value = sample.value;
            self.trigger = TriggerReason::from_derivative(sample.derivative);
        }

        // Full detail array: summary fields still advance
        let _ = self.samples.push(sample);

        self.end_timestamp = sample.timestamp;
        self.end_value = sample.value;
        self.sample_count += 1;

        self.sample_count >= self.max_samples
            || elapsed_ms(self.start_timestamp, self.end_timestamp) >= self.max_duration_ms
    }

    /// Classify, emit and reset; `None` if empty
    pub fn finalize(&mut self) -> Option<ChangingEvent<M>> {
        if self.sample_count == 0 {
            return None;
        }

        let mean = mean_derivative(&self.samples);
        let net_change = i64::from(self.end_value) - i64::from(self.start_value);

        let event = ChangingEvent {
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            start_value: self.start_value,
            end_value: self.end_value,
            sample_count: self.sample_count,
            samples: core::mem::take(&mut self.samples),
            trigger: self.trigger,
            kind: classify(mean, net_change, self.threshold_high),
            mean_derivative: mean,
        };

        self.sample_count = 0;
        Some(event)
    }

    /// Samples in the current interval, stored or not
    pub fn count(&self) -> u32 {
        self.sample_count
    }

    /// True if no sample since the last finalize
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use proptest::prelude::*;

    fn stable_config(min_ms: u64, floor: u32, max_ms: u64) -> SignalConfig {
        SignalConfig {
            min_stable_duration_ms: min_ms,
            min_stable_samples: floor,
            max_stable_duration_ms: max_ms,
            ..SignalConfig::default()
        }
    }

    fn sample(ts: Timestamp, value: u32, derivative: f32) -> ProcessedSample {
        ProcessedSample { timestamp: ts, value, derivative }
    }

    #[test]
    fn stable_needs_duration_and_floor() {
        let mut acc = StableAccumulator::new(&stable_config(1000, 5, 60_000));

        // Duration reached, floor not
        assert!(!acc.add(100, 0));
        assert!(!acc.add(100, 1500));
        for ts in [1600, 1700] {
            assert!(!acc.add(100, ts));
        }
        assert!(acc.add(100, 1800));
    }

    #[test]
    fn stable_max_timeout_ignores_floor() {
        let mut acc = StableAccumulator::new(&stable_config(1000, 1000, 5000));
        acc.add(100, 0);
        assert!(acc.add(100, 5000));
    }

    #[test]
    fn stable_summary_statistics() {
        let mut acc = StableAccumulator::new(&stable_config(0, 1, 60_000));
        acc.add(10, 100);
        acc.add(30, 200);
        acc.add(20, 300);

        let summary = acc.finalize().expect("non-empty");
        assert_eq!(summary.start_timestamp, 100);
        assert_eq!(summary.end_timestamp, 300);
        assert_eq!(summary.sample_count, 3);
        assert_eq!(summary.average, 20);
        assert_eq!((summary.min, summary.max), (10, 30));
        assert!(acc.is_empty());
    }

    #[test]
    fn empty_accumulators_emit_nothing() {
        let config = SignalConfig::default();
        assert!(StableAccumulator::new(&config).finalize().is_none());
        assert!(ChangingBuilder::<8>::new(&config).finalize().is_none());
    }

    #[test]
    fn small_detail_capacity_keeps_summary_fields() {
        let config = SignalConfig { max_changing_samples: 10, ..SignalConfig::default() };
        let mut builder = ChangingBuilder::<3>::new(&config);
        for i in 0..6u32 {
            builder.add(sample(u64::from(i) * 100, 1_000 + i * 500, 5_000.0));
        }

        let event: ChangingEvent<3> = builder.finalize().expect("non-empty");
        assert_eq!(event.samples.len(), 3);
        assert_eq!(event.samples[2].timestamp, 200);
        assert_eq!(event.sample_count, 6);
        assert_eq!(event.end_timestamp, 500);
        assert_eq!(event.end_value, 3_500);
    }

    #[test]
    fn changing_latches_start_and_trigger() {
        let config = SignalConfig { threshold_high: 1000.0, ..SignalConfig::default() };
        let mut builder: ChangingBuilder = ChangingBuilder::new(&config);
        builder.add(sample(100, 500, -4000.0));
        builder.add(sample(200, 400, -4000.0));
        builder.add(sample(300, 300, -4000.0));

        let event = builder.finalize().expect("non-empty");
        assert_eq!(event.start_timestamp, 100);
        assert_eq!(event.end_timestamp, 300);
        assert_eq!((event.start_value, event.end_value), (500, 300));
        assert_eq!(event.trigger, TriggerReason::DerivativeFalling);
        assert_eq!(event.kind, EventKind::Falling);
        assert!(builder.is_empty());
    }

    #[test]
    fn changing_closes_on_sample_cap() {
        let config = SignalConfig { max_changing_samples: 3, ..SignalConfig::default() };
        let mut builder: ChangingBuilder = ChangingBuilder::new(&config);
        assert!(!builder.add(sample(0, 1, 1.0)));
        assert!(!builder.add(sample(10, 2, 1.0)));
        assert!(builder.add(sample(20, 3, 1.0)));
    }

    #[test]
    fn changing_closes_on_duration() {
        let config = SignalConfig { max_changing_duration_ms: 1000, ..SignalConfig::default() };
        let mut builder: ChangingBuilder = ChangingBuilder::new(&config);
        assert!(!builder.add(sample(0, 1, 1.0)));
        assert!(builder.add(sample(1000, 2, 1.0)));
    }

    #[test]
    fn split_interval_latches_trigger_from_derivative() {
        let config = SignalConfig { max_changing_samples: 2, ..SignalConfig::default() };
        let mut builder: ChangingBuilder = ChangingBuilder::new(&config);
        builder.add(sample(0, 1, 50_000.0));
        assert!(builder.add(sample(10, 2, 50_000.0)));

        let first = builder.finalize().expect("non-empty");
        assert_eq!(first.trigger, TriggerReason::DerivativeRising);

        builder.add(sample(20, 3, 50_000.0));
        let second = builder.finalize().expect("non-empty");
        assert_eq!(second.trigger, TriggerReason::DerivativeRising);

        builder.add(sample(30, 2, -50_000.0));
        let third = builder.finalize().expect("non-empty");
        assert_eq!(third.trigger, TriggerReason::DerivativeFalling);
    }

    proptest! {
        #[test]
        fn stable_never_finalizes_empty(
            steps in prop::collection::vec(
                (0u64..500, 10_000u32..16_000_000, any::<bool>()),
                0..200,
            ),
        ) {
            let mut acc = StableAccumulator::new(&stable_config(1000, 5, 4000));
            let mut ts = 0;
            for (dt, value, force) in steps {
                ts += dt;
                let ready = acc.add(value, ts);
                if ready || force {
                    if let Some(summary) = acc.finalize() {
                        prop_assert!(summary.sample_count > 0);
                        prop_assert!(summary.end_timestamp >= summary.start_timestamp);
                        prop_assert!(summary.min <= summary.average);
                        prop_assert!(summary.average <= summary.max);
                    }
                }
            }
        }

        #[test]
        fn detail_never_exceeds_capacity(extra in 1u32..200) {
            let cap = MAX_SAMPLES_PER_EVENT as u32;
            let config = SignalConfig {
                max_changing_samples: cap + extra,
                max_changing_duration_ms: u64::MAX,
                ..SignalConfig::default()
            };
            let mut builder: ChangingBuilder = ChangingBuilder::new(&config);

            let total = cap + extra;
            for i in 0..total {
                builder.add(sample(u64::from(i) * 10, 1_000 + i, 100.0));
            }

            let event = builder.finalize().expect("non-empty");
            prop_assert_eq!(event.samples.len(), MAX_SAMPLES_PER_EVENT);
            prop_assert_eq!(event.sample_count, total);
            prop_assert_eq!(event.end_timestamp, u64::from(total - 1) * 10);
            prop_assert_eq!(event.end_value, 1_000 + total - 1);
        }
    }
}
