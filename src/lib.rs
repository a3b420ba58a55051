//! Serial configuration link for a LiDAR detection controller.
//!
//! This library implements the host side of the controller's configuration
//! protocol: the fixed binary packet framing with an 8-bit additive checksum,
//! the closed command table shared with the device firmware, and a link
//! manager that owns the serial transport on a dedicated worker thread. The
//! consumer (typically a UI) enqueues [`CommandRequest`]s and polls a queue of
//! [`Event`]s; it never touches the transport or the receive buffer directly.
//!
//! # Quick Start
//!
//! ```rust
//! use lidarlink::protocol::{self, DecodeOutcome};
//!
//! // Frame a status request
//! let frame = protocol::encode(b'S', &[])?;
//! assert_eq!(frame, [0x7E, 0x53, 0x00, 0x53]);
//!
//! // Decode it back
//! match protocol::decode(&frame) {
//!     DecodeOutcome::Complete { packet, consumed } => {
//!         assert_eq!(packet.command(), b'S');
//!         assert_eq!(consumed, frame.len());
//!     }
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok::<(), lidarlink::protocol::Error>(())
//! ```
//!
//! Driving a real device:
//!
//! ```rust,no_run
//! use lidarlink::{CommandRequest, Event, LinkManager, DEFAULT_BAUD_RATE};
//!
//! let link = LinkManager::spawn();
//! link.connect("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//! link.send(CommandRequest::read_distances())?;
//! while let Some(event) = link.try_recv() {
//!     if let Event::Packet(packet) = event {
//!         println!("response: {:02X}", packet.command());
//!     }
//! }
//! # Ok::<(), lidarlink::LinkError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod link;
pub mod protocol;

pub use link::{ConnectionState, Event, LinkError, LinkManager, DEFAULT_BAUD_RATE};
pub use protocol::{
    Command, CommandRequest, DecodeOutcome, DecodedPacket, Error, NakError, Response, Result,
    VelocityBound,
};
