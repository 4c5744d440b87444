//! Sample acquisition
//!
//! [`SampleAcquirer`] polls a [`ReadingSource`] once per reader tick and
//! turns the outcome into a timestamped [`Reading`]. Rejected values and bus
//! faults still produce a reading, marked invalid, so downstream statistics
//! see every tick.
//!
//! Bus faults are logged once when the bus goes bad and once when it comes
//! back, never per occurrence. After `bus_fault_threshold` consecutive
//! faults the source is reinitialized, the validation baseline is dropped
//! and [`Notification::BUS_ERROR_RECOVERED`] is posted.

use crate::config::ValidationConfig;
use crate::system::Notification;
use crate::time::Timestamp;
use crate::traits::{Notifier, Reading, ReadingSource};
use crate::validation::{ReadingValidator, ValidationStats};

/// Acquisition counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquisitionStats {
    /// Readings produced, valid or not
    pub readings: u32,
    /// Ticks with no conversion ready
    pub not_ready: u32,
    /// Bus faults
    pub bus_faults: u32,
    /// Successful bus reinitializations
    pub reinitializations: u32,
    /// Failed bus reinitializations
    pub reinit_failures: u32,
}

/// Reader-side front end: source + validator + fault recovery
pub struct SampleAcquirer<S: ReadingSource> {
    source: S,
    validator: ReadingValidator,
    bus_fault_threshold: u32,
    consecutive_faults: u32,
    faulted: bool,
    stats: AcquisitionStats,
}

impl<S: ReadingSource> SampleAcquirer<S> {
    /// Wrap `source` with the checks in `config`
    pub fn new(source: S, config: ValidationConfig) -> Self {
        Self {
            source,
            bus_fault_threshold: config.bus_fault_threshold,
            validator: ReadingValidator::new(config),
            consecutive_faults: 0,
            faulted: false,
            stats: AcquisitionStats::default(),
        }
    }

    /// Poll the source once
    ///
    /// Returns `None` when no conversion is ready yet.
    pub fn acquire<N: Notifier + ?Sized>(
        &mut self,
        now: Timestamp,
        notifier: &N,
    ) -> Option<Reading> {
        match self.source.read_raw() {
            Err(nb::Error::WouldBlock) => {
                self.stats.not_ready += 1;
                None
            }
            Ok(raw) => {
                if self.faulted {
                    log_info!("sensor bus recovered after {} faults", self.consecutive_faults);
                    self.faulted = false;
                }
                self.consecutive_faults = 0;
                self.stats.readings += 1;

                let reading = match self.validator.validate(raw) {
                    Ok(value) => Reading::valid(now, value),
                    Err(_) => Reading::invalid(now, raw),
                };
                Some(reading)
            }
            Err(nb::Error::Other(_err)) => {
                self.on_bus_fault(notifier);
                self.stats.readings += 1;
                Some(Reading::invalid(now, 0))
            }
        }
    }

    fn on_bus_fault<N: Notifier + ?Sized>(&mut self, notifier: &N) {
        self.stats.bus_faults += 1;
        self.consecutive_faults += 1;

        if !self.faulted {
            log_warn!("sensor bus fault");
            self.faulted = true;
        }

        if self.consecutive_faults < self.bus_fault_threshold {
            return;
        }

        self.consecutive_faults = 0;
        match self.source.reinitialize() {
            Ok(()) => {
                log_info!("sensor bus reinitialized");
                self.stats.reinitializations += 1;
                self.validator.reset_baseline();
                notifier.notify(Notification::BUS_ERROR_RECOVERED);
            }
            Err(_err) => {
                log_warn!("sensor bus reinitialization failed: {:?}", _err);
                self.stats.reinit_failures += 1;
            }
        }
    }

    /// Consecutive bus faults since the last good read or reinit
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    /// True between a fault and the next good read
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Acquisition counters
    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Validation counters
    pub fn validation_stats(&self) -> ValidationStats {
        self.validator.stats()
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Value(u32),
        Pending,
        Fault,
    }

    #[derive(Default)]
    struct ScriptedSource {
        script: VecDeque<Step>,
        reinits: u32,
    }

    impl ScriptedSource {
        fn new(steps: &[Step]) -> Self {
            Self { script: steps.iter().copied().collect(), reinits: 0 }
        }
    }

    impl ReadingSource for ScriptedSource {
        type Error = ();

        fn read_raw(&mut self) -> nb::Result<u32, ()> {
            match self.script.pop_front() {
                Some(Step::Value(v)) => Ok(v),
                Some(Step::Fault) => Err(nb::Error::Other(())),
                Some(Step::Pending) | None => Err(nb::Error::WouldBlock),
            }
        }

        fn reinitialize(&mut self) -> Result<(), ()> {
            self.reinits += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder(Cell<u32>);

    impl Notifier for Recorder {
        fn notify(&self, n: Notification) {
            self.0.set(self.0.get() | n.bits());
        }
    }

    fn config(bus_faults: u32) -> ValidationConfig {
        ValidationConfig { bus_fault_threshold: bus_faults, ..ValidationConfig::default() }
    }

    #[test]
    fn pending_conversion_yields_nothing() {
        let mut acq = SampleAcquirer::new(ScriptedSource::new(&[Step::Pending]), config(5));
        assert_eq!(acq.acquire(0, &Recorder::default()), None);
        assert_eq!(acq.stats().not_ready, 1);
    }

    #[test]
    fn good_and_rejected_values() {
        let steps = [Step::Value(3_450_000), Step::Value(5)];
        let mut acq = SampleAcquirer::new(ScriptedSource::new(&steps), config(5));
        let n = Recorder::default();

        assert_eq!(acq.acquire(100, &n), Some(Reading::valid(100, 3_450_000)));
        assert_eq!(acq.acquire(200, &n), Some(Reading::invalid(200, 5)));
        assert_eq!(acq.validation_stats().out_of_range, 1);
    }

    #[test]
    fn faults_trigger_reinit_and_notification() {
        let steps = [
            Step::Value(3_450_000),
            Step::Fault,
            Step::Fault,
            Step::Fault,
            Step::Value(9_000_000),
        ];
        let mut acq = SampleAcquirer::new(ScriptedSource::new(&steps), config(3));
        let n = Recorder::default();

        acq.acquire(0, &n);
        for t in 1..=3 {
            assert_eq!(acq.acquire(t, &n), Some(Reading::invalid(t, 0)));
        }

        assert_eq!(acq.source().reinits, 1);
        assert!(Notification::from_bits(n.0.get()).contains(Notification::BUS_ERROR_RECOVERED));

        // Baseline dropped with the reinit, so a large jump is accepted
        assert_eq!(acq.acquire(4, &n), Some(Reading::valid(4, 9_000_000)));
        assert!(!acq.is_faulted());
    }

    #[test]
    fn good_read_clears_fault_streak() {
        let steps = [Step::Fault, Step::Fault, Step::Value(3_450_000), Step::Fault, Step::Fault];
        let mut acq = SampleAcquirer::new(ScriptedSource::new(&steps), config(3));
        let n = Recorder::default();

        for t in 0..5 {
            acq.acquire(t, &n);
        }
        assert_eq!(acq.source().reinits, 0);
        assert_eq!(acq.consecutive_faults(), 2);
        assert_eq!(n.0.get(), 0);
    }
}
