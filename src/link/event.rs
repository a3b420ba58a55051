//! Events flowing from the worker to the consumer.

use crate::protocol::DecodedPacket;

/// One item on the inbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A human-readable log line, already level-tagged.
    Log(String),
    /// A checksum-valid frame received from the controller.
    Packet(DecodedPacket),
    /// The transport failed and was closed; reconnect to resume.
    Disconnected,
}
