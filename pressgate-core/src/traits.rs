//! Core traits and the reading type
//!
//! These are the seams between the pipeline and everything outside it:
//! the sensor bus, the supervisor's notification bus, the serializer and
//! the outbound queue. Keep them small - a firmware port implements each
//! of them once.

use crate::errors::EncodeError;
use crate::events::Event;
use crate::message::OutboundMessage;
use crate::system::Notification;
use crate::time::Timestamp;

/// One sample as delivered by the reader
///
/// Invalid readings are still timestamped and delivered so statistics see
/// them, but they never enter the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Monotonic milliseconds, strictly increasing per producer
    pub timestamp: Timestamp,
    /// Raw ADC count
    pub raw: u32,
    /// Passed range and plausibility checks
    pub is_valid: bool,
}

impl Reading {
    /// A reading that passed validation
    pub const fn valid(timestamp: Timestamp, raw: u32) -> Self {
        Self { timestamp, raw, is_valid: true }
    }

    /// A rejected reading or a bus fault
    pub const fn invalid(timestamp: Timestamp, raw: u32) -> Self {
        Self { timestamp, raw, is_valid: false }
    }
}

/// Sink for supervisor notifications
///
/// Implementations must not block; posting from a hot loop is normal.
pub trait Notifier {
    /// Post one or more notification bits
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Notifier that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Raw access to the pressure sensor bus
///
/// `read_raw` follows the `nb` convention: `WouldBlock` means no conversion
/// is ready yet, `Other` is a bus fault.
pub trait ReadingSource {
    /// Bus-level error
    type Error: core::fmt::Debug;

    /// Poll for the latest conversion result
    fn read_raw(&mut self) -> nb::Result<u32, Self::Error>;

    /// Reset the bus after repeated faults
    fn reinitialize(&mut self) -> Result<(), Self::Error>;
}

/// Turns a batch of events into a transport message
pub trait BatchEncoder {
    /// Encode `events`, stamped with the send time
    fn encode(
        &mut self,
        events: &[Event],
        sent_at: Timestamp,
    ) -> Result<OutboundMessage, EncodeError>;
}

/// Non-blocking hand-off to the network publisher
pub trait OutboundSink {
    /// Queue `message`; give it back if the queue is full
    fn try_send(&mut self, message: OutboundMessage) -> Result<(), OutboundMessage>;
}
