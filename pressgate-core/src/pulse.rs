//! Pulse-Train Grouping
//!
//! Alternative front end for flow meters that emit one edge per unit of
//! volume. An interrupt handler pushes edge timestamps into a
//! [`RingChannel`](crate::queue::RingChannel); the grouper folds them into
//! trains of roughly constant period.
//!
//! ## Grouping Rule
//!
//! ```text
//! period     = ts − last_ts
//! tolerance  = prev_period >> 3        (12.5 %), or the inactivity timeout
//!                                       for the first period of a train
//! |period − prev_period| ≤ tolerance   → pulse joins the train
//! otherwise                             → train closes, a new one starts
//!                                       at the last pulse (count 2)
//! ```
//!
//! A train also closes after [`PULSE_INACTIVITY_TIMEOUT_MS`] without edges.
//! Only trains of at least two pulses are reported, with
//! `average_period = period_sum / (count − 1)`.

use crate::constants::sampling::PULSE_INACTIVITY_TIMEOUT_MS;
use crate::time::{elapsed_ms, Timestamp};

/// A closed pulse train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseGroup {
    /// First edge
    pub start_timestamp: Timestamp,
    /// Last edge
    pub end_timestamp: Timestamp,
    /// Edges in the train
    pub pulse_count: u32,
    /// Mean edge-to-edge period in ms
    pub average_period: u64,
}

#[derive(Debug, Clone, Copy)]
struct OpenTrain {
    first: Timestamp,
    last: Timestamp,
    count: u32,
    period_sum: u64,
    prev_period: u64,
}

/// Folds edge timestamps into [`PulseGroup`]s
#[derive(Debug, Clone)]
pub struct PulseGrouper {
    train: Option<OpenTrain>,
    inactivity_timeout_ms: u64,
    last_activity: Timestamp,
}

impl PulseGrouper {
    /// Grouper with the default inactivity timeout
    pub fn new() -> Self {
        Self::with_timeout(PULSE_INACTIVITY_TIMEOUT_MS)
    }

    /// Grouper closing idle trains after `inactivity_timeout_ms`
    pub fn with_timeout(inactivity_timeout_ms: u64) -> Self {
        Self {
            train: None,
            inactivity_timeout_ms,
            last_activity: 0,
        }
    }

    /// Feed one edge; returns a train closed by a period mismatch
    pub fn on_pulse(&mut self, timestamp: Timestamp) -> Option<PulseGroup> {
        self.last_activity = timestamp;

        let Some(train) = self.train.as_mut() else {
            self.train = Some(OpenTrain {
                first: timestamp,
                last: timestamp,
                count: 1,
                period_sum: 0,
                prev_period: 0,
            });
            return None;
        };

        let period = elapsed_ms(train.last, timestamp);
        let tolerance = if train.prev_period > 0 {
            train.prev_period >> 3
        } else {
            self.inactivity_timeout_ms
        };

        let mut closed = None;
        if period.abs_diff(train.prev_period) > tolerance {
            if train.count > 1 {
                closed = Some(Self::close(train));
                train.first = train.last;
                train.count = 2;
                train.period_sum = period;
            } else {
                // Lone edge followed by a long gap: restart from this edge
                train.first = timestamp;
                train.count = 1;
                train.period_sum = 0;
                train.last = timestamp;
                train.prev_period = 0;
                return None;
            }
        } else {
            train.count += 1;
            train.period_sum += period;
        }

        train.prev_period = period;
        train.last = timestamp;

        if let Some(group) = &closed {
            log_debug!(
                "pulse train {}..{}: {} pulses, {} ms",
                group.start_timestamp, group.end_timestamp, group.pulse_count, group.average_period
            );
        }
        closed
    }

    /// Check for inactivity at `now`; returns the train it closes
    pub fn on_idle(&mut self, now: Timestamp) -> Option<PulseGroup> {
        let quiet_for = elapsed_ms(self.last_activity, now);
        if self.train.is_none() || quiet_for < self.inactivity_timeout_ms {
            return None;
        }

        self.train
            .take()
            .filter(|train| train.count > 1)
            .map(|train| Self::close(&train))
    }

    fn close(train: &OpenTrain) -> PulseGroup {
        PulseGroup {
            start_timestamp: train.first,
            end_timestamp: train.last,
            pulse_count: train.count,
            average_period: train.period_sum / u64::from(train.count - 1),
        }
    }

    /// True while a train is open
    pub fn is_active(&self) -> bool {
        self.train.is_some()
    }
}

impl Default for PulseGrouper {
    fn default() -> Self {
        Self::new()
    }
}
