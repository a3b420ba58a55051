//! Validated frame contents and outbound command requests.

use bytes::Bytes;

use super::{Error, MAX_PAYLOAD_SIZE, RSP_ACK, RSP_NAK, Result};

/// Contents of a frame whose checksum validated.
///
/// Produced only by [`decode`](super::decode); the payload is exactly the
/// bytes the frame declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    command: u8,
    payload: Bytes,
    declared_len: u8,
}

impl DecodedPacket {
    pub(crate) fn from_parts(command: u8, payload: Bytes, declared_len: u8) -> Self {
        Self {
            command,
            payload,
            declared_len,
        }
    }

    /// Command byte of the frame.
    #[must_use]
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Payload bytes of the frame.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Length byte as declared on the wire.
    #[must_use]
    pub fn declared_len(&self) -> u8 {
        self.declared_len
    }

    /// Whether this frame is a positive acknowledgment.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.command == RSP_ACK
    }

    /// Whether this frame is a negative acknowledgment.
    #[must_use]
    pub fn is_nak(&self) -> bool {
        self.command == RSP_NAK
    }
}

/// An outbound command, validated before it is queued for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: u8,
    payload: Bytes,
}

impl CommandRequest {
    /// Build a request from a raw command byte and payload.
    ///
    /// Rejects payloads longer than [`MAX_PAYLOAD_SIZE`] so that nothing
    /// malformed ever reaches the transport. Prefer the typed builders on
    /// this struct for known commands.
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self { command, payload })
    }

    /// Construct from parts already known to satisfy the payload bound.
    pub(crate) fn from_validated(command: u8, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        Self { command, payload }
    }

    /// Command byte to transmit.
    #[must_use]
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Payload bytes to transmit.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}
