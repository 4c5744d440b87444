//! Monotonic clock for workers

use pressgate_core::{TimeSource, Timestamp};
use tokio::time::Instant;

/// Milliseconds since the clock was created
///
/// Backed by `tokio::time::Instant`, so paused test time drives it too.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    boot: Instant,
}

impl TokioClock {
    /// Clock starting at zero now
    pub fn start() -> Self {
        Self { boot: Instant::now() }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::start()
    }
}

impl TimeSource for TokioClock {
    fn now(&self) -> Timestamp {
        self.boot.elapsed().as_millis() as Timestamp
    }
}
