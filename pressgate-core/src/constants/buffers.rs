//! Channel and Batch Capacities
//!
//! Every queue in the gateway is fixed-capacity and fails fast when full.

/// Readings buffered between the reader and the signal pipeline.
///
/// 30 s of samples at 10 Hz; covers a stalled telemetry worker during
/// a reconnect without losing data.
pub const READING_QUEUE_SIZE: usize = 300;

/// Finalized events waiting for the batcher.
pub const EVENT_QUEUE_SIZE: usize = 10;

/// Serialized messages waiting for the network publisher.
pub const OUTBOUND_QUEUE_SIZE: usize = 10;

/// Edge timestamps buffered between the pulse interrupt and the grouper.
pub const PULSE_QUEUE_SIZE: usize = 64;

/// Events per outbound message.
///
/// Five stable summaries fit easily in
/// [`super::transport::MAX_PAYLOAD_SIZE`]; a batch of detailed changing
/// events may not, and is then sent without detail.
pub const MAX_EVENTS_PER_MESSAGE: usize = 5;
