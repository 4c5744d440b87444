//! Finalized Signal Events
//!
//! ## Overview
//!
//! The signal path collapses a 10 Hz stream into a handful of events:
//!
//! - [`StableSummary`]: a flat run, summarized by min/max/average
//! - [`ChangingEvent`]: a ramp or disturbance, with a bounded set of detail
//!   samples and a classification assigned when it closes
//!
//! Both travel through the event channel as the tagged union [`Event`] and
//! are consumed exactly once by the batcher.
//!
//! ## Memory Layout
//!
//! A changing event carries up to `M` detail samples inline (16 bytes
//! each). With the default `M` of [`MAX_SAMPLES_PER_EVENT`] an `Event` is
//! roughly 850 bytes, and the event channel holds ten of them.

use heapless::Vec;

use crate::constants::MAX_SAMPLES_PER_EVENT;
use crate::time::Timestamp;

/// Classification of a finalized interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Flat, or too little net movement to call a trend
    Stable,
    /// Value went up
    Rising,
    /// Value went down
    Falling,
    /// Derivative and net change disagree (overshoot and return)
    Oscillation,
}

impl EventKind {
    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Stable => "stable",
            EventKind::Rising => "rising",
            EventKind::Falling => "falling",
            EventKind::Oscillation => "oscillation",
        }
    }
}

/// Why an interval was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// Derivative crossed the threshold upwards
    DerivativeRising,
    /// Derivative crossed the threshold downwards
    DerivativeFalling,
    /// Interval closed by its duration policy
    Timeout,
}

impl TriggerReason {
    /// Latch from the sign of the derivative at entry
    pub fn from_derivative(derivative: f32) -> Self {
        if derivative > 0.0 {
            TriggerReason::DerivativeRising
        } else {
            TriggerReason::DerivativeFalling
        }
    }

    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggerReason::DerivativeRising => "derivative_rising",
            TriggerReason::DerivativeFalling => "derivative_falling",
            TriggerReason::Timeout => "timeout",
        }
    }
}

/// One filtered sample inside a changing interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedSample {
    /// Sample time
    pub timestamp: Timestamp,
    /// Filtered value, rounded to counts
    pub value: u32,
    /// Smoothed derivative at this sample (counts/s)
    pub derivative: f32,
}

/// Statistics of a flat run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableSummary {
    /// First sample time
    pub start_timestamp: Timestamp,
    /// Last sample time
    pub end_timestamp: Timestamp,
    /// Samples in the run, never zero
    pub sample_count: u32,
    /// `sum / count`, used as both start and end value
    pub average: u32,
    /// Smallest filtered value
    pub min: u32,
    /// Largest filtered value
    pub max: u32,
}

/// A finalized changing interval holding up to `M` detail samples
#[derive(Debug, Clone, PartialEq)]
pub struct ChangingEvent<const M: usize = MAX_SAMPLES_PER_EVENT> {
    /// First sample time
    pub start_timestamp: Timestamp,
    /// Last sample time
    pub end_timestamp: Timestamp,
    /// First filtered value
    pub start_value: u32,
    /// Last filtered value
    pub end_value: u32,
    /// All samples seen, including those not stored in `samples`
    pub sample_count: u32,
    /// Detail samples, at most `M`
    pub samples: Vec<ProcessedSample, M>,
    /// Derivative sign at entry
    pub trigger: TriggerReason,
    /// Assigned at finalize
    pub kind: EventKind,
    /// Mean of the stored sample derivatives
    pub mean_derivative: f32,
}

impl<const M: usize> ChangingEvent<M> {
    /// Signed `end_value - start_value`
    pub fn net_change(&self) -> i64 {
        i64::from(self.end_value) - i64::from(self.start_value)
    }
}

/// Event carried by the event channel
#[derive(Debug, Clone, PartialEq)]
pub enum Event<const M: usize = MAX_SAMPLES_PER_EVENT> {
    /// Flat run
    Stable(StableSummary),
    /// Ramp or disturbance
    Changing(ChangingEvent<M>),
}

impl<const M: usize> Event<M> {
    /// First sample time
    pub fn start_timestamp(&self) -> Timestamp {
        match self {
            Event::Stable(s) => s.start_timestamp,
            Event::Changing(c) => c.start_timestamp,
        }
    }

    /// Last sample time
    pub fn end_timestamp(&self) -> Timestamp {
        match self {
            Event::Stable(s) => s.end_timestamp,
            Event::Changing(c) => c.end_timestamp,
        }
    }

    /// Samples covered by the event
    pub fn sample_count(&self) -> u32 {
        match self {
            Event::Stable(s) => s.sample_count,
            Event::Changing(c) => c.sample_count,
        }
    }

    /// `end - start`
    pub fn duration_ms(&self) -> u64 {
        self.end_timestamp().saturating_sub(self.start_timestamp())
    }

    /// Classification; stable summaries are always [`EventKind::Stable`]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Stable(_) => EventKind::Stable,
            Event::Changing(c) => c.kind,
        }
    }

    /// Why the event was opened; stable summaries are closed by their
    /// duration policy
    pub fn trigger(&self) -> TriggerReason {
        match self {
            Event::Stable(_) => TriggerReason::Timeout,
            Event::Changing(c) => c.trigger,
        }
    }
}
