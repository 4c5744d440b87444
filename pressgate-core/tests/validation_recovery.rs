//! Reading validation and sensor bus recovery

mod common;

use std::collections::VecDeque;

use pressgate_core::{
    config::ValidationConfig,
    errors::ValidationError,
    reader::SampleAcquirer,
    system::Notification,
    traits::{Reading, ReadingSource},
    validation::ReadingValidator,
};

use common::RecordingNotifier;

#[test]
fn reject_streak_reanchors_baseline_and_accepts_new_level() {
    let config = ValidationConfig { invalid_reset_threshold: 10, ..ValidationConfig::default() };
    let mut validator = ReadingValidator::new(config);

    validator.validate(3_450_000).unwrap();

    // Pump swapped: every reading is now a "spike" against the old baseline
    for _ in 0..9 {
        assert!(matches!(
            validator.validate(4_200_000),
            Err(ValidationError::StepExceeded { .. })
        ));
    }
    assert_eq!(validator.baseline(), Some(3_450_000));

    assert!(validator.validate(4_200_000).is_err());
    assert_eq!(validator.baseline(), Some(4_200_000));

    // The new level is accepted without a stale-baseline rejection
    assert_eq!(validator.validate(4_200_000), Ok(4_200_000));
    assert_eq!(validator.validate(4_210_000), Ok(4_210_000));
    assert_eq!(validator.stats().baseline_resets, 1);
}

#[test]
fn out_of_range_after_reset_is_still_rejected() {
    let config = ValidationConfig { invalid_reset_threshold: 2, ..ValidationConfig::default() };
    let mut validator = ReadingValidator::new(config);

    validator.validate(3_450_000).unwrap();
    validator.validate(9_000_000).unwrap_err();
    validator.validate(9_000_000).unwrap_err();
    assert_eq!(validator.baseline(), Some(9_000_000));

    assert!(matches!(
        validator.validate(20_000_000),
        Err(ValidationError::OutOfRange { .. })
    ));
    assert_eq!(validator.validate(9_000_000), Ok(9_000_000));
}

#[derive(Debug, Clone, Copy)]
enum Bus {
    Ok(u32),
    Timeout,
}

struct FlakyBus {
    script: VecDeque<Bus>,
    reinits: u32,
}

impl ReadingSource for FlakyBus {
    type Error = &'static str;

    fn read_raw(&mut self) -> nb::Result<u32, Self::Error> {
        match self.script.pop_front() {
            Some(Bus::Ok(v)) => Ok(v),
            Some(Bus::Timeout) => Err(nb::Error::Other("i2c timeout")),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn reinitialize(&mut self) -> Result<(), Self::Error> {
        self.reinits += 1;
        Ok(())
    }
}

#[test]
fn bus_faults_reinitialize_after_threshold() {
    let mut script: VecDeque<Bus> = VecDeque::new();
    script.push_back(Bus::Ok(3_450_000));
    script.extend(std::iter::repeat(Bus::Timeout).take(12));
    script.push_back(Bus::Ok(6_000_000));

    let bus = FlakyBus { script, reinits: 0 };
    let config = ValidationConfig { bus_fault_threshold: 5, ..ValidationConfig::default() };
    let mut acquirer = SampleAcquirer::new(bus, config);
    let notifier = RecordingNotifier::default();

    let mut readings = Vec::new();
    for tick in 0..15u64 {
        readings.extend(acquirer.acquire(tick * 100, &notifier));
    }

    assert_eq!(readings.len(), 14);
    assert_eq!(readings[0], Reading::valid(0, 3_450_000));
    assert!(readings[1..13].iter().all(|r| !r.is_valid));

    // 12 faults at a threshold of 5: two reinits, two notifications
    assert_eq!(acquirer.source().reinits, 2);
    assert_eq!(notifier.count(Notification::BUS_ERROR_RECOVERED), 2);
    assert_eq!(acquirer.stats().bus_faults, 12);

    // Baseline dropped by the reinit, so the new level is accepted
    assert_eq!(readings[13], Reading::valid(1_300, 6_000_000));
    assert!(!acquirer.is_faulted());

    // Script exhausted: no conversion ready
    assert_eq!(acquirer.acquire(1_500, &notifier), None);
}
