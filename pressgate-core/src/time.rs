//! Time handling for the gateway
//!
//! All timestamps in the signal path are monotonic milliseconds since boot.
//! Stages never read a clock themselves; the worker that owns a stage reads
//! its [`TimeSource`] once per iteration and passes `now` down.

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Fixed time source for testing and replay
///
/// Interior mutability lets a test advance the clock while a worker holds
/// a shared reference to it.
#[derive(Debug, Default)]
pub struct FixedTime {
    timestamp: core::cell::Cell<Timestamp>,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp: core::cell::Cell::new(timestamp) }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get().saturating_add(ms));
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Milliseconds from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Convert a value delta over `time_delta_ms` into units per second
///
/// Returns 0 for a zero time delta so duplicate timestamps never divide by zero.
pub fn rate_per_second(value_delta: f32, time_delta_ms: u64) -> f32 {
    if time_delta_ms == 0 {
        return 0.0;
    }

    value_delta * 1000.0 / time_delta_ms as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let time = FixedTime::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);

        let by_ref = &time;
        assert_eq!(by_ref.now(), 1500);
    }

    #[test]
    fn rate_calculation() {
        // 10 units in 500ms = 20 units/second
        assert_eq!(rate_per_second(10.0, 500), 20.0);

        // Zero time delta
        assert_eq!(rate_per_second(10.0, 0), 0.0);
    }

    #[test]
    fn elapsed_never_underflows() {
        assert_eq!(elapsed_ms(2000, 1000), 0);
        assert_eq!(elapsed_ms(1000, 2500), 1500);
    }
}
