//! Protocol error types

use thiserror::Error;

use super::command::Command;

/// Errors raised while framing requests or decoding responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Payload exceeds the frame's length field.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Command byte outside the closed command table.
    #[error("unknown command byte: {byte:#04x}")]
    UnknownCommand {
        /// Offending byte
        byte: u8,
    },

    /// The command is valid but only ever appears in requests.
    #[error("command '{command}' is request-only and cannot be decoded as a response")]
    UnexpectedResponse {
        /// Offending command
        command: Command,
    },

    /// Response payload length does not match the command's fixed shape.
    #[error("unexpected payload length for '{command}': expected {expected}, got {got}")]
    PayloadLength {
        /// Command being decoded
        command: Command,
        /// Expected payload length
        expected: usize,
        /// Actual payload length
        got: usize,
    },

    /// Request field rejected before transmission.
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        /// Name of the rejected field
        field: &'static str,
        /// Provided value
        value: i64,
        /// Lower bound, inclusive
        min: i64,
        /// Upper bound, inclusive
        max: i64,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
