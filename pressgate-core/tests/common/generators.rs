//! Raw count series generators
//!
//! Every generator returns `(timestamp, raw)` pairs at a fixed spacing.
//! Noise comes from a small LCG so runs are reproducible.

use pressgate_core::time::Timestamp;

/// `count` samples of `value` starting at `start`, `step_ms` apart
pub fn constant(value: u32, start: Timestamp, step_ms: u64, count: usize) -> Vec<(Timestamp, u32)> {
    (0..count).map(|i| (start + i as u64 * step_ms, value)).collect()
}

/// Linear ramp from `from` (exclusive) to `to` (inclusive) over `duration_ms`
///
/// The first sample lands at `start + step_ms`.
pub fn ramp(
    from: u32,
    to: u32,
    start: Timestamp,
    duration_ms: u64,
    step_ms: u64,
) -> Vec<(Timestamp, u32)> {
    let steps = duration_ms / step_ms;
    let delta = i64::from(to) - i64::from(from);

    (1..=steps)
        .map(|i| {
            let value = i64::from(from) + delta * i as i64 / steps as i64;
            (start + i * step_ms, value as u32)
        })
        .collect()
}

/// Hold `from`, ramp to `to`, hold `to`
pub fn hold_ramp_hold(
    from: u32,
    to: u32,
    step_ms: u64,
    hold_ms: u64,
    ramp_ms: u64,
    tail_ms: u64,
) -> Vec<(Timestamp, u32)> {
    let mut series = constant(from, 0, step_ms, (hold_ms / step_ms) as usize + 1);
    let ramp_start = hold_ms;
    series.extend(ramp(from, to, ramp_start, ramp_ms, step_ms));

    let tail_start = ramp_start + ramp_ms + step_ms;
    series.extend(constant(to, tail_start, step_ms, (tail_ms / step_ms) as usize));
    series
}

/// Deterministic uniform noise of ±`amplitude` around `value`
pub struct NoisySeries {
    state: u32,
}

impl NoisySeries {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_unit(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((self.state >> 8) as f32 / (1u32 << 24) as f32) * 2.0 - 1.0
    }

    pub fn around(
        &mut self,
        value: u32,
        amplitude: u32,
        start: Timestamp,
        step_ms: u64,
        count: usize,
    ) -> Vec<(Timestamp, u32)> {
        (0..count)
            .map(|i| {
                let offset = self.next_unit() * amplitude as f32;
                (start + i as u64 * step_ms, (value as f32 + offset) as u32)
            })
            .collect()
    }
}
