//! Core signal path for the Pressgate pressure gateway
//!
//! Turns a 10 Hz stream of raw transducer counts into a handful of
//! meaningful events (flat runs and ramps) and batches them for upload.
//! Also carries the device lifecycle rules the runtime supervisor applies.
//!
//! Key constraints:
//! - Runs on an ESP32-class MCU next to Wi-Fi and MQTT stacks
//! - No heap allocation on the sample path (outbound messages excepted)
//! - Every queue is bounded; a full queue drops and counts, never blocks
//!
//! ```no_run
//! use pressgate_core::{ReadingValidator, SignalPipeline, Reading};
//! use pressgate_core::config::{SignalConfig, ValidationConfig};
//!
//! let mut validator = ReadingValidator::new(ValidationConfig::default());
//! let mut pipeline: SignalPipeline = SignalPipeline::new(SignalConfig::default()).unwrap();
//!
//! let reading = match validator.validate(3_450_000) {
//!     Ok(raw) => Reading::valid(0, raw),
//!     Err(_) => Reading::invalid(0, 3_450_000),
//! };
//! for event in pipeline.process(&reading) {
//!     // hand to the event channel
//!     let _ = event;
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod accumulator;
pub mod batcher;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod derivative;
pub mod detector;
pub mod errors;
pub mod events;
pub mod filter;
pub mod message;
pub mod pipeline;
pub mod pulse;
pub mod queue;
pub mod reader;
pub mod system;
pub mod time;
pub mod traits;
pub mod validation;

// Public API
pub use batcher::{FlushOutcome, MessageBatcher};
pub use errors::{ConfigError, EncodeError, ValidationError, ValidationResult};
pub use events::{ChangingEvent, Event, EventKind, ProcessedSample, StableSummary, TriggerReason};
pub use message::{OutboundMessage, QoS};
pub use pipeline::SignalPipeline;
pub use pulse::{PulseGroup, PulseGrouper};
pub use queue::{EventChannel, RingChannel};
pub use reader::SampleAcquirer;
pub use system::{enabled_workers, next_state, Notification, SystemState, Worker, WorkerSet};
pub use time::{TimeSource, Timestamp};
pub use traits::{BatchEncoder, Notifier, OutboundSink, Reading, ReadingSource};
pub use validation::ReadingValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
