//! Outbound channel on tokio
//!
//! On a host the publisher is an async task, so the outbound channel is a
//! bounded tokio mpsc rather than a polled ring. Producers still never
//! wait: a full channel hands the message back.

use pressgate_core::{OutboundMessage, OutboundSink};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Producer side of the outbound channel
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<OutboundMessage>,
}

impl OutboundSender {
    /// Free slots right now
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// True once the publisher side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl OutboundSink for OutboundSender {
    fn try_send(&mut self, message: OutboundMessage) -> Result<(), OutboundMessage> {
        self.tx.try_send(message).map_err(|err| match err {
            TrySendError::Full(message) | TrySendError::Closed(message) => message,
        })
    }
}

/// Bounded outbound channel holding `capacity` messages
pub fn outbound_channel(capacity: usize) -> (OutboundSender, mpsc::Receiver<OutboundMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (OutboundSender { tx }, rx)
}
