//! Shared fixtures for connector tests

#![allow(dead_code)]

use pressgate_core::{Event, StableSummary, Timestamp};

/// A flat run ending at `end`
pub fn stable_at(end: Timestamp, average: u32) -> Event {
    Event::Stable(StableSummary {
        start_timestamp: end.saturating_sub(5_000),
        end_timestamp: end,
        sample_count: 51,
        average,
        min: average - 150,
        max: average + 150,
    })
}

/// Parse a payload as JSON
pub fn json(payload: &[u8]) -> serde_json::Value {
    serde_json::from_slice(payload).expect("payload is JSON")
}
