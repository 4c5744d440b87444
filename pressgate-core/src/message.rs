//! Outbound message envelope

use alloc::string::String;
use alloc::vec::Vec;

/// Delivery guarantee requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QoS {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery, may duplicate
    AtLeastOnce,
}

/// Serialized message ready for the network publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic
    pub topic: String,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// Requested delivery guarantee
    pub qos: QoS,
}

impl OutboundMessage {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for an empty payload
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
