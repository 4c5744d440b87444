//! Signal Processing Pipeline
//!
//! ## Overview
//!
//! One [`SignalPipeline`] owns every stage between a validated reading and a
//! finalized event. It is driven by a single consumer of the reading
//! channel, so no stage needs interior locking.
//!
//! ```text
//! Reading ──→ SignalFilter ──→ DerivativeEstimator ──→ SignalStateMachine
//!                  │                                        │
//!                  └────────→ StableAccumulator ←── STABLE ─┤
//!                             ChangingBuilder  ←── CHANGING ┘
//!                                   │
//!                                   ↓
//!                                 Event(s)
//! ```
//!
//! ## Per-Reading Steps
//!
//! 1. Invalid readings are counted and skipped. They never reach the filter.
//! 2. The raw count is smoothed, and the smoothed value enters the
//!    derivative window.
//! 3. The state machine sees the smoothed derivative. On a transition the
//!    accumulator of the state being left is finalized first.
//! 4. The sample is added to the accumulator of the current state, which
//!    may finalize on its own policy.
//!
//! A single reading can therefore close at most two events: the interval
//! that a transition ends, and a policy close of the interval it starts.
//!
//! ## Example
//!
//! ```rust
//! use pressgate_core::pipeline::SignalPipeline;
//! use pressgate_core::config::SignalConfig;
//! use pressgate_core::traits::Reading;
//!
//! let mut pipeline: SignalPipeline = SignalPipeline::new(SignalConfig::default())?;
//! for i in 0..10u64 {
//!     for event in pipeline.process(&Reading::valid(i * 100, 3_450_000)) {
//!         let _ = event;
//!     }
//! }
//! assert_eq!(pipeline.stats().readings, 10);
//! # Ok::<(), pressgate_core::errors::ConfigError>(())
//! ```

use heapless::Vec;

use crate::accumulator::{ChangingBuilder, StableAccumulator};
use crate::config::SignalConfig;
use crate::constants::{DERIVATIVE_WINDOW_SIZE, MAX_SAMPLES_PER_EVENT};
use crate::derivative::DerivativeEstimator;
use crate::detector::{SignalState, SignalStateMachine};
use crate::errors::ConfigError;
use crate::events::{Event, ProcessedSample};
use crate::filter::SignalFilter;
use crate::traits::Reading;

/// Events closed by one reading
pub type ProcessOutput<const M: usize = MAX_SAMPLES_PER_EVENT> = Vec<Event<M>, 2>;

/// Pipeline counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Valid readings processed
    pub readings: u32,
    /// Invalid readings skipped
    pub invalid_readings: u32,
    /// Stable summaries emitted
    pub stable_events: u32,
    /// Changing intervals emitted
    pub changing_events: u32,
    /// State machine transitions
    pub transitions: u32,
}

/// Filter, derivative, state machine and accumulators in one unit
///
/// `W` is the derivative window length, `M` the detail capacity of
/// changing events.
#[derive(Debug, Clone)]
pub struct SignalPipeline<
    const W: usize = DERIVATIVE_WINDOW_SIZE,
    const M: usize = MAX_SAMPLES_PER_EVENT,
> {
    filter: SignalFilter,
    derivative: DerivativeEstimator<W>,
    detector: SignalStateMachine,
    stable: StableAccumulator,
    changing: ChangingBuilder<M>,
    started: bool,
    last_value: Option<u32>,
    stats: PipelineStats,
}

impl<const W: usize, const M: usize> SignalPipeline<W, M> {
    /// Build every stage from `config`
    pub fn new(config: SignalConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            filter: SignalFilter::from_config(&config),
            derivative: DerivativeEstimator::from_config(&config),
            detector: SignalStateMachine::new(&config),
            stable: StableAccumulator::new(&config),
            changing: ChangingBuilder::new(&config),
            started: false,
            last_value: None,
            stats: PipelineStats::default(),
        })
    }

    /// Run one reading through every stage
    pub fn process(&mut self, reading: &Reading) -> ProcessOutput<M> {
        let mut out = ProcessOutput::<M>::new();

        if !reading.is_valid {
            self.stats.invalid_readings += 1;
            return out;
        }

        let now = reading.timestamp;
        if !self.started {
            self.detector.start(now);
            self.started = true;
        }
        self.stats.readings += 1;

        let filtered = self.filter.filter(reading.raw as f32);
        let derivative = self.derivative.update(filtered, now);
        let value = libm::roundf(filtered) as u32;
        self.last_value = Some(value);

        let previous = self.detector.state();
        if self.detector.update(derivative, now) {
            self.stats.transitions += 1;
            let closed = match previous {
                SignalState::Stable => self.stable.finalize().map(Event::Stable),
                SignalState::Changing => self.changing.finalize().map(Event::Changing),
            };
            self.emit(&mut out, closed);
        }

        let closed = match self.detector.state() {
            SignalState::Stable => {
                if self.stable.add(value, now) {
                    self.stable.finalize().map(Event::Stable)
                } else {
                    None
                }
            }
            SignalState::Changing => {
                let sample = ProcessedSample { timestamp: now, value, derivative };
                if self.changing.add(sample) {
                    self.changing.finalize().map(Event::Changing)
                } else {
                    None
                }
            }
        };
        self.emit(&mut out, closed);

        out
    }

    fn emit(&mut self, out: &mut ProcessOutput<M>, event: Option<Event<M>>) {
        let Some(event) = event else { return };

        match &event {
            Event::Stable(s) => {
                self.stats.stable_events += 1;
                log_debug!(
                    "stable {}..{} avg {} ({} samples)",
                    s.start_timestamp,
                    s.end_timestamp,
                    s.average,
                    s.sample_count
                );
            }
            Event::Changing(c) => {
                self.stats.changing_events += 1;
                log_debug!(
                    "{} {}..{} {} -> {} ({} samples)",
                    c.kind.as_str(),
                    c.start_timestamp,
                    c.end_timestamp,
                    c.start_value,
                    c.end_value,
                    c.sample_count
                );
            }
        }

        // At most one transition close and one policy close per reading
        let _ = out.push(event);
    }

    /// Close whatever interval is open, e.g. before shutting down
    pub fn flush(&mut self) -> Option<Event<M>> {
        let closed = match self.detector.state() {
            SignalState::Stable => self.stable.finalize().map(Event::Stable),
            SignalState::Changing => self.changing.finalize().map(Event::Changing),
        };
        let mut out = ProcessOutput::<M>::new();
        self.emit(&mut out, closed);
        out.pop()
    }

    /// Current regime
    pub fn state(&self) -> SignalState {
        self.detector.state()
    }

    /// Last smoothed derivative, units per second
    pub fn derivative(&self) -> f32 {
        self.derivative.smoothed()
    }

    /// Last filtered value, rounded
    pub fn last_value(&self) -> Option<u32> {
        self.last_value
    }

    /// Counters
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Emit a one-line counter summary at info level
    pub fn log_stats(&self) {
        let _s = self.stats;
        log_info!(
            "pipeline: {} readings ({} invalid), {} stable, {} changing, {} transitions, {:?}",
            _s.readings,
            _s.invalid_readings,
            _s.stable_events,
            _s.changing_events,
            _s.transitions,
            self.detector.state()
        );
    }
}
