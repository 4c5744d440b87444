//! STABLE / CHANGING state machine
//!
//! Entering CHANGING needs `|d| > T_high`. Leaving it needs `|d| < T_high·H`
//! *and* a minimum dwell in CHANGING, so a derivative hovering around the
//! threshold cannot make the machine flap.

use crate::config::SignalConfig;
use crate::time::{elapsed_ms, Timestamp};

/// Signal regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalState {
    /// Derivative below threshold
    #[default]
    Stable,
    /// Derivative crossed the threshold and has not settled yet
    Changing,
}

/// Two-state classifier over the smoothed derivative
#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    state: SignalState,
    state_entered_at: Timestamp,
    last_transition_at: Option<Timestamp>,
    transitions: u32,
    threshold_high: f32,
    threshold_low: f32,
    min_dwell_ms: u64,
}

impl SignalStateMachine {
    /// Machine in STABLE with thresholds from `config`
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            state: SignalState::Stable,
            state_entered_at: 0,
            last_transition_at: None,
            transitions: 0,
            threshold_high: config.threshold_high,
            threshold_low: config.threshold_low(),
            min_dwell_ms: config.min_changing_dwell_ms,
        }
    }

    /// Stamp the entry time of the initial state
    pub fn start(&mut self, now: Timestamp) {
        self.state_entered_at = now;
    }

    /// Feed the smoothed derivative; returns true if the state changed
    pub fn update(&mut self, derivative: f32, now: Timestamp) -> bool {
        let magnitude = libm::fabsf(derivative);

        let next = match self.state {
            SignalState::Stable if magnitude > self.threshold_high => SignalState::Changing,
            SignalState::Changing
                if magnitude < self.threshold_low
                    && elapsed_ms(self.state_entered_at, now) >= self.min_dwell_ms =>
            {
                SignalState::Stable
            }
            current => current,
        };

        if next == self.state {
            return false;
        }

        log_debug!(
            "signal {:?} -> {:?} at {} ms (d = {:.0}/s)",
            self.state, next, now, derivative
        );

        self.state = next;
        self.state_entered_at = now;
        self.last_transition_at = Some(now);
        self.transitions = self.transitions.wrapping_add(1);
        true
    }

    /// Current state
    pub fn state(&self) -> SignalState {
        self.state
    }

    /// Time the current state was entered
    pub fn state_entered_at(&self) -> Timestamp {
        self.state_entered_at
    }

    /// Time of the most recent transition
    pub fn last_transition_at(&self) -> Option<Timestamp> {
        self.last_transition_at
    }

    /// Transitions since construction
    pub fn transitions(&self) -> u32 {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(dwell: u64) -> SignalConfig {
        SignalConfig {
            threshold_high: 1000.0,
            hysteresis: 0.8,
            min_changing_dwell_ms: dwell,
            ..SignalConfig::default()
        }
    }

    #[test]
    fn enters_changing_above_threshold() {
        let mut sm = SignalStateMachine::new(&config(0));
        sm.start(0);

        assert!(!sm.update(999.0, 100));
        assert!(sm.update(-1001.0, 200));
        assert_eq!(sm.state(), SignalState::Changing);
        assert_eq!(sm.state_entered_at(), 200);
        assert_eq!(sm.transitions(), 1);
    }

    #[test]
    fn hysteresis_band_holds_changing() {
        let mut sm = SignalStateMachine::new(&config(0));
        sm.update(2000.0, 0);

        // 900 is below T_high but above T_high·H
        assert!(!sm.update(900.0, 1000));
        assert_eq!(sm.state(), SignalState::Changing);

        assert!(sm.update(700.0, 1100));
        assert_eq!(sm.state(), SignalState::Stable);
        assert_eq!(sm.last_transition_at(), Some(1100));
    }

    #[test]
    fn dwell_blocks_early_exit() {
        let mut sm = SignalStateMachine::new(&config(500));
        sm.update(5000.0, 1000);

        assert!(!sm.update(0.0, 1100));
        assert!(!sm.update(0.0, 1499));
        assert!(sm.update(0.0, 1500));
    }

    proptest! {
        #[test]
        fn never_leaves_changing_before_dwell(
            dwell in 0u64..2000,
            derivatives in prop::collection::vec(-3000f32..3000.0, 1..100),
        ) {
            let mut sm = SignalStateMachine::new(&config(dwell));
            sm.start(0);
            let mut now = 0;

            for d in derivatives {
                now += 10;
                let entered = sm.state_entered_at();
                let was_changing = sm.state() == SignalState::Changing;
                if sm.update(d, now) && was_changing {
                    prop_assert!(now - entered >= dwell);
                }
            }
        }
    }
}
