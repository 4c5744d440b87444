//! End-to-end behaviour of the signal pipeline
//!
//! Raw series in, finalized events out: flat runs, ramps in both
//! directions, a valve slam with the production tuning, and noise that
//! must not be mistaken for movement.

mod common;

use pressgate_core::{
    config::SignalConfig,
    detector::SignalState,
    events::{EventKind, TriggerReason},
    pipeline::SignalPipeline,
    traits::Reading,
};

use common::{generators, partition, run_series};

/// Unfiltered, fast-reacting tuning for 100 Hz ramp tests
fn ramp_config() -> SignalConfig {
    SignalConfig {
        alpha_primary: 1.0,
        alpha_secondary: 1.0,
        derivative_alpha: 1.0,
        threshold_high: 100_000.0,
        hysteresis: 0.8,
        min_changing_dwell_ms: 100,
        min_stable_duration_ms: 200,
        min_stable_samples: 10,
        max_changing_samples: 100,
        ..SignalConfig::default()
    }
}

#[test]
fn flat_signal_yields_one_stable_summary() {
    let config = SignalConfig {
        min_stable_duration_ms: 2000,
        min_stable_samples: 20,
        ..SignalConfig::default()
    };
    let mut pipeline: SignalPipeline = SignalPipeline::new(config).unwrap();

    // 3 s at 10 Hz
    let series = generators::constant(3_450_000, 0, 100, 30);
    let events = run_series(&mut pipeline, &series);

    assert_eq!(events.len(), 1, "events: {:?}", events);
    let (stable, changing) = partition(&events);
    assert!(changing.is_empty());

    let summary = stable[0];
    assert!(summary.average.abs_diff(3_450_000) <= 2, "average {}", summary.average);
    assert!(summary.sample_count >= 20);
    assert_eq!(summary.start_timestamp, 0);
    assert_eq!(pipeline.state(), SignalState::Stable);
}

#[test]
fn ramp_up_yields_one_rising_event() {
    let mut pipeline = SignalPipeline::<3>::new(ramp_config()).unwrap();

    // 3.45M → 3.6M over 500 ms at 100 Hz
    let series = generators::hold_ramp_hold(3_450_000, 3_600_000, 10, 1000, 500, 1000);
    let events = run_series(&mut pipeline, &series);

    let (stable, changing) = partition(&events);
    assert_eq!(changing.len(), 1, "changing: {:?}", changing);

    let event = changing[0];
    assert_eq!(event.kind, EventKind::Rising);
    assert_eq!(event.trigger, TriggerReason::DerivativeRising);
    assert!(event.start_value.abs_diff(3_450_000) <= 10_000, "start {}", event.start_value);
    assert_eq!(event.end_value, 3_600_000);
    assert!(event.end_timestamp >= event.start_timestamp);
    assert!(event.samples.len() <= event.sample_count as usize);

    // Flat runs on both sides of the ramp
    assert!(stable.iter().any(|s| s.average == 3_450_000));
    assert!(stable.iter().any(|s| s.average == 3_600_000));
    assert_eq!(pipeline.stats().transitions, 2);
}

#[test]
fn ramp_down_yields_one_falling_event() {
    let mut pipeline = SignalPipeline::<3>::new(ramp_config()).unwrap();

    let series = generators::hold_ramp_hold(3_600_000, 3_450_000, 10, 1000, 500, 1000);
    let events = run_series(&mut pipeline, &series);

    let (_, changing) = partition(&events);
    assert_eq!(changing.len(), 1);
    assert_eq!(changing[0].kind, EventKind::Falling);
    assert_eq!(changing[0].trigger, TriggerReason::DerivativeFalling);
    assert!(changing[0].net_change() < 0);
}

#[test]
fn valve_slam_with_production_tuning() {
    let mut pipeline: SignalPipeline = SignalPipeline::new(SignalConfig::default()).unwrap();

    let mut series = generators::constant(3_450_000, 0, 100, 100);
    series.extend(generators::constant(2_450_000, 10_000, 100, 500));
    let events = run_series(&mut pipeline, &series);

    let (stable, changing) = partition(&events);
    assert!(!changing.is_empty(), "a 1M drop must open a changing interval");

    let first = changing[0];
    assert_eq!(first.kind, EventKind::Falling);
    assert_eq!(first.trigger, TriggerReason::DerivativeFalling);
    assert!(changing.iter().all(|c| c.kind != EventKind::Rising));

    let last = stable.last().expect("settles into stable runs");
    assert!(last.average.abs_diff(2_450_000) <= 1_000, "settled at {}", last.average);
    assert_eq!(pipeline.state(), SignalState::Stable);
}

#[test]
fn sensor_noise_is_not_movement() {
    let mut pipeline: SignalPipeline = SignalPipeline::new(SignalConfig::default()).unwrap();

    let mut noise = generators::NoisySeries::new(42);
    let series = noise.around(3_450_000, 2_000, 0, 100, 600);
    let events = run_series(&mut pipeline, &series);

    let (stable, changing) = partition(&events);
    assert!(changing.is_empty(), "noise opened {} changing intervals", changing.len());
    assert!(stable.len() >= 10);
    for summary in stable {
        assert!(summary.average.abs_diff(3_450_000) <= 2_000);
        assert!(summary.min <= summary.average && summary.average <= summary.max);
    }
}

#[test]
fn invalid_readings_leave_state_untouched() {
    let mut pipeline = SignalPipeline::<3>::new(ramp_config()).unwrap();

    for i in 0..50u64 {
        let reading = if i % 2 == 0 {
            Reading::valid(i * 10, 3_450_000)
        } else {
            Reading::invalid(i * 10, 0)
        };
        pipeline.process(&reading);
    }

    let stats = pipeline.stats();
    assert_eq!(stats.readings, 25);
    assert_eq!(stats.invalid_readings, 25);
    assert_eq!(stats.changing_events, 0);
    assert_eq!(pipeline.last_value(), Some(3_450_000));
}
