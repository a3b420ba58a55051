//! Transport seam between the link worker and the physical serial line.
//!
//! The worker only sees the [`Transport`] trait, so tests can drive the full
//! loop over an in-memory double; production code opens real ports through
//! [`SerialOpener`].

use std::io::{self, Read, Write};
use std::time::Duration;

use super::error::LinkError;

/// Read timeout on the serial line, short enough that the worker loop stays
/// responsive without busy-spinning.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A point-to-point byte transport exclusively owned by the link worker.
pub trait Transport: Send {
    /// Read whatever bytes are currently available into `buf`.
    ///
    /// Returns `Ok(0)` when the line is idle (read timeout); an `Err` means
    /// the transport has genuinely failed and must be closed.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write a complete frame to the line.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Factory for [`Transport`] instances, injected into the worker.
pub trait TransportOpener: Send {
    /// Open the transport at `port` with the given baud rate.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, LinkError>;
}

/// Opens real serial ports with the cooperative [`READ_TIMEOUT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl TransportOpener for SerialOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, LinkError> {
        let port = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Box::new(SerialLink { port }))
    }
}

struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl Transport for SerialLink {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(err) if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }
}
