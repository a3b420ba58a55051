//! Frame codec (encode/decode)
//!
//! Stateless framing for the controller's packet format:
//!
//! ```text
//! [START 0x7E] [COMMAND] [LENGTH] [PAYLOAD (0..=64)] [CHECKSUM]
//! ```
//!
//! The checksum is the 8-bit sum of command, length, and payload bytes. The
//! decoder reports how many bytes it consumed so the caller can drive a
//! streaming resynchronization loop over a growing receive buffer.

use bytes::Bytes;

use super::{Error, FRAME_OVERHEAD, MAX_PAYLOAD_SIZE, Result, START_BYTE};
use super::packet::DecodedPacket;

/// Outcome of a [`decode`] attempt against the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A checksum-valid frame was decoded from the front of the buffer.
    Complete {
        /// The decoded frame contents.
        packet: DecodedPacket,
        /// Bytes consumed from the front of the buffer.
        consumed: usize,
    },
    /// Not enough bytes yet; consume nothing and wait for more.
    Incomplete,
    /// The front of the buffer is not a valid frame.
    ///
    /// `consumed == 0` means position 0 is not a frame start and the caller
    /// should scan forward for the next [`START_BYTE`]. `consumed > 0` means a
    /// structurally complete frame failed its checksum; discarding the whole
    /// frame guarantees forward progress.
    Invalid {
        /// Bytes to discard from the front of the buffer.
        consumed: usize,
    },
}

/// 8-bit additive checksum over command, length, and payload bytes.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Encode a command and payload into a complete frame.
///
/// Fails with [`Error::PayloadTooLarge`] if the payload exceeds
/// [`MAX_PAYLOAD_SIZE`]; nothing is written in that case.
pub fn encode(command: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.push(START_BYTE);
    frame.push(command);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[1..]));
    Ok(frame)
}

/// Attempt to decode one frame from the front of `buffer`.
#[must_use]
pub fn decode(buffer: &[u8]) -> DecodeOutcome {
    if buffer.len() < FRAME_OVERHEAD {
        return DecodeOutcome::Incomplete;
    }

    if buffer[0] != START_BYTE {
        return DecodeOutcome::Invalid { consumed: 0 };
    }

    let length = buffer[2] as usize;
    let total = FRAME_OVERHEAD + length;
    if buffer.len() < total {
        return DecodeOutcome::Incomplete;
    }

    // Checksum covers command, length, and payload.
    if checksum(&buffer[1..total - 1]) != buffer[total - 1] {
        return DecodeOutcome::Invalid { consumed: total };
    }

    let packet = DecodedPacket::from_parts(
        buffer[1],
        Bytes::copy_from_slice(&buffer[3..3 + length]),
        buffer[2],
    );
    DecodeOutcome::Complete {
        packet,
        consumed: total,
    }
}
