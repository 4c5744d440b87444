//! Common test utilities for integration tests
//!
//! This module provides:
//! - Raw count series generators (flat, ramps, noise)
//! - Recording collaborators: notifier, encoder, outbound sink
//! - A helper that drives a pipeline over a series and collects events

#![allow(dead_code)]

use std::cell::RefCell;

use pressgate_core::{
    errors::EncodeError,
    events::Event,
    message::{OutboundMessage, QoS},
    pipeline::SignalPipeline,
    system::Notification,
    time::Timestamp,
    traits::{BatchEncoder, Notifier, OutboundSink, Reading},
};

pub mod generators;

/// Notifier that remembers every post
#[derive(Default)]
pub struct RecordingNotifier {
    posts: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn posts(&self) -> Vec<Notification> {
        self.posts.borrow().clone()
    }

    pub fn count(&self, notification: Notification) -> usize {
        self.posts.borrow().iter().filter(|n| n.contains(notification)).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.posts.borrow_mut().push(notification);
    }
}

/// Encoder that records batch sizes and emits a one-byte payload
#[derive(Default)]
pub struct CountingEncoder {
    pub batches: Vec<usize>,
}

impl BatchEncoder for CountingEncoder {
    fn encode(
        &mut self,
        events: &[Event],
        _sent_at: Timestamp,
    ) -> Result<OutboundMessage, EncodeError> {
        if events.is_empty() {
            return Err(EncodeError::EmptyBatch);
        }
        self.batches.push(events.len());
        Ok(OutboundMessage {
            topic: "test/events".to_string(),
            payload: vec![events.len() as u8],
            qos: QoS::AtMostOnce,
        })
    }
}

/// Unbounded outbound sink
#[derive(Default)]
pub struct VecSink {
    pub messages: Vec<OutboundMessage>,
}

impl OutboundSink for VecSink {
    fn try_send(&mut self, message: OutboundMessage) -> Result<(), OutboundMessage> {
        self.messages.push(message);
        Ok(())
    }
}

/// Feed `series` through `pipeline` and collect every emitted event
pub fn run_series<const W: usize>(
    pipeline: &mut SignalPipeline<W>,
    series: &[(Timestamp, u32)],
) -> Vec<Event> {
    series
        .iter()
        .flat_map(|&(ts, raw)| pipeline.process(&Reading::valid(ts, raw)))
        .collect()
}

/// Split collected events by kind
pub fn partition(
    events: &[Event],
) -> (Vec<&pressgate_core::StableSummary>, Vec<&pressgate_core::ChangingEvent>) {
    let mut stable = Vec::new();
    let mut changing = Vec::new();
    for event in events {
        match event {
            Event::Stable(s) => stable.push(s),
            Event::Changing(c) => changing.push(c),
        }
    }
    (stable, changing)
}
