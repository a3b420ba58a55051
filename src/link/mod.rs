//! Link management: the worker thread that owns the serial transport.
//!
//! The consumer holds a [`LinkManager`] handle and communicates with the
//! worker exclusively through queues plus a read-only connection-state
//! snapshot; the transport handle and receive buffer live on the worker side
//! only.

mod error;
mod event;
mod manager;
mod state;
pub mod transport;

pub use error::LinkError;
pub use event::Event;
pub use manager::{DEFAULT_BAUD_RATE, LinkManager};
pub use state::ConnectionState;
