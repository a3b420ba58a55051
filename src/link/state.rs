//! Connection state machine and its shared read-only snapshot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the link to the detection controller.
///
/// Mutated only by the worker; the consumer observes it through
/// [`LinkManager::state`](super::LinkManager::state). `Error` is recoverable
/// only by another connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No transport is open.
    Disconnected = 0,
    /// A connect attempt is in progress.
    Connecting = 1,
    /// The transport is open and the stimulus exchange succeeded.
    Connected = 2,
    /// The last connect attempt failed.
    Error = 3,
}

impl ConnectionState {
    /// Convert to the snapshot-cell representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert from the snapshot-cell representation.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Error,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Shared cell carrying the worker's state to consumer-side snapshots.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Disconnected.as_u8())))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }
}
