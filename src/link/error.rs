//! Link-level error types

use thiserror::Error;

/// Errors surfaced to the consumer by the link layer.
///
/// Transport faults inside the worker loop never appear here; they are
/// reported through the event queue and the connection state instead.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Serial port error while opening or configuring the line.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker thread has already shut down.
    #[error("link worker has shut down")]
    WorkerGone,
}
