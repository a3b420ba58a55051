//! Wire protocol shared with the detection controller firmware.
//!
//! This module provides the frame constants, the stateless codec, and the
//! closed command table. Every constant here must stay bit-exact with the
//! firmware.

mod codec;
mod command;
mod error;
mod packet;

pub use codec::{DecodeOutcome, checksum, decode, encode};
pub use command::{
    Command, MAX_DISTANCE_CM, MAX_VELOCITY_MPH, MIN_DISTANCE_CM, MIN_VELOCITY_MPH, MPH_TO_CMS,
    NakError, Response, SWITCH_COUNT, VelocityBound, cm_per_s_to_mph, mph_to_cm_per_s,
};
pub use error::{Error, Result};
pub use packet::{CommandRequest, DecodedPacket};

/// Sentinel marking the start of every frame.
pub const START_BYTE: u8 = 0x7E;

/// Reserved response command acknowledging a write.
pub const RSP_ACK: u8 = 0x06;

/// Reserved response command rejecting a write; payload carries the error code.
pub const RSP_NAK: u8 = 0x15;

/// Maximum payload length a frame may carry.
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Fixed bytes around the payload: start, command, length, checksum.
pub const FRAME_OVERHEAD: usize = 4;
