//! Duplex link manager.
//!
//! [`LinkManager`] spawns one worker thread that exclusively owns the
//! transport handle and the receive buffer. The consumer enqueues control
//! requests and commands and polls the event queue; every blocking operation
//! (open, settle delays, reads, writes) happens on the worker. Cancellation
//! is cooperative: a flag checked once per loop iteration plus a bounded
//! join.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use tracing::{debug, error, info, warn};

use super::error::LinkError;
use super::event::Event;
use super::state::{ConnectionState, StateCell};
use super::transport::{SerialOpener, Transport, TransportOpener};
use crate::protocol::{self, Command, CommandRequest, DecodeOutcome, START_BYTE};

/// Baud rate of the controller's configuration interface.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Settle delay around opening the port and the stimulus exchange.
const SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Spacing after each outbound frame; the controller's receive buffer is small.
const WRITE_SPACING: Duration = Duration::from_millis(50);
/// Sleep per iteration while no transport is open.
const IDLE_SLEEP: Duration = Duration::from_millis(100);
/// Sleep at the end of every connected iteration.
const LOOP_SLEEP: Duration = Duration::from_millis(10);
/// The receive buffer is cleared once it exceeds this size with no start byte
/// anywhere in it.
const PURGE_THRESHOLD: usize = 100;
/// Bounded wait for the worker thread to exit during `stop`.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 256;

enum Control {
    Connect { port: String, baud_rate: u32 },
    Disconnect,
}

/// Consumer-side handle to the link worker.
///
/// Created once at startup and kept for the process lifetime; a connection
/// may open and close many times within that lifetime.
pub struct LinkManager {
    control_tx: Sender<Control>,
    command_tx: Sender<CommandRequest>,
    event_rx: Receiver<Event>,
    state: StateCell,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LinkManager {
    /// Spawn the worker against real serial ports.
    #[must_use]
    pub fn spawn() -> Self {
        Self::with_opener(Box::new(SerialOpener))
    }

    /// Spawn the worker with an injected transport factory.
    #[must_use]
    pub fn with_opener(opener: Box<dyn TransportOpener>) -> Self {
        let (control_tx, control_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let state = StateCell::new();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_state = state.clone();
        let worker_stop = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("lidarlink-io".into())
            .spawn(move || {
                Worker {
                    opener,
                    transport: None,
                    rx_buffer: BytesMut::new(),
                    control_rx,
                    command_rx,
                    event_tx,
                    state: worker_state,
                    stop: worker_stop,
                }
                .run();
            })
            .expect("failed to spawn link worker thread");

        Self {
            control_tx,
            command_tx,
            event_rx,
            state,
            stop,
            worker: Some(worker),
        }
    }

    /// Request a connection to `port` at `baud_rate`.
    ///
    /// The open happens on the worker; its outcome is observable through
    /// [`state`](Self::state) and a single log event.
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<(), LinkError> {
        self.control_tx
            .send(Control::Connect {
                port: port.to_owned(),
                baud_rate,
            })
            .map_err(|_| LinkError::WorkerGone)
    }

    /// Request a disconnect. Idempotent if already disconnected.
    pub fn disconnect(&self) -> Result<(), LinkError> {
        self.control_tx
            .send(Control::Disconnect)
            .map_err(|_| LinkError::WorkerGone)
    }

    /// Enqueue one command for transmission.
    pub fn send(&self, request: CommandRequest) -> Result<(), LinkError> {
        self.command_tx
            .send(request)
            .map_err(|_| LinkError::WorkerGone)
    }

    /// Poll the inbound queue without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<Event> {
        self.event_rx.try_recv().ok()
    }

    /// Read-only snapshot of the connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the link is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    /// Stop the worker: set the termination flag and wait, bounded, for the
    /// loop to finish. The worker closes the transport on its way out.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let deadline = Instant::now() + STOP_TIMEOUT;
            while !worker.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                warn!("link worker did not stop within {STOP_TIMEOUT:?}, detaching");
            }
        }
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker-side state: exclusively owned, never shared.
struct Worker {
    opener: Box<dyn TransportOpener>,
    transport: Option<Box<dyn Transport>>,
    rx_buffer: BytesMut,
    control_rx: Receiver<Control>,
    command_rx: Receiver<CommandRequest>,
    event_tx: Sender<Event>,
    state: StateCell,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        debug!("link worker started");
        while !self.stop.load(Ordering::Acquire) {
            self.drain_control();

            // At most one outbound frame per iteration, then a gap, so a
            // burst of queued writes cannot overrun the controller.
            if let Ok(request) = self.command_rx.try_recv() {
                self.transmit(&request);
                thread::sleep(WRITE_SPACING);
            }

            if self.transport.is_none() {
                thread::sleep(IDLE_SLEEP);
                continue;
            }

            self.pump();
            thread::sleep(LOOP_SLEEP);
        }
        self.transport = None;
        debug!("link worker stopped");
    }

    fn drain_control(&mut self) {
        while let Ok(control) = self.control_rx.try_recv() {
            match control {
                Control::Connect { port, baud_rate } => self.open_link(&port, baud_rate),
                Control::Disconnect => self.close_link(),
            }
        }
    }

    fn open_link(&mut self, port: &str, baud_rate: u32) {
        if self.transport.take().is_some() {
            debug!("closing previous transport before reconnect");
        }
        self.state.set(ConnectionState::Connecting);
        thread::sleep(SETTLE_DELAY);

        let mut transport = match self.opener.open(port, baud_rate) {
            Ok(transport) => transport,
            Err(err) => {
                error!(%err, port, "connect failed");
                self.state.set(ConnectionState::Error);
                self.emit_log("ERROR", &format!("Error connecting to {port}: {err}"));
                return;
            }
        };
        thread::sleep(SETTLE_DELAY);

        // Stimulus: a status request nudges the controller out of its boot
        // loop and into configuration mode.
        let stimulus = match protocol::encode(Command::Status.as_u8(), &[]) {
            Ok(frame) => frame,
            Err(err) => {
                error!(%err, port, "stimulus encode failed");
                self.state.set(ConnectionState::Error);
                self.emit_log("ERROR", &format!("Error connecting to {port}: {err}"));
                return;
            }
        };
        if let Err(err) = transport.write_all(&stimulus) {
            error!(%err, port, "stimulus write failed");
            self.state.set(ConnectionState::Error);
            self.emit_log("ERROR", &format!("Error connecting to {port}: {err}"));
            return;
        }
        thread::sleep(SETTLE_DELAY);

        self.rx_buffer.clear();
        self.transport = Some(transport);
        self.state.set(ConnectionState::Connected);
        info!(port, baud_rate, "link connected");
        self.emit_log("INFO", &format!("Connected to {port} at {baud_rate} baud."));
    }

    fn close_link(&mut self) {
        let was_open = self.transport.take().is_some();
        self.state.set(ConnectionState::Disconnected);
        if was_open {
            info!("link disconnected");
            self.emit_log("INFO", "Disconnected.");
        }
    }

    fn transmit(&mut self, request: &CommandRequest) {
        if self.transport.is_none() {
            warn!(command = request.command(), "dropping command, not connected");
            self.emit_log("WARNING", "Cannot send packet, not connected.");
            return;
        }

        let frame = match protocol::encode(request.command(), request.payload()) {
            Ok(frame) => frame,
            Err(err) => {
                // Rejected before any byte reaches the wire.
                error!(%err, command = request.command(), "outbound validation failed");
                self.emit_log("ERROR", &format!("Error sending packet: {err}"));
                return;
            }
        };

        let result = self.transport.as_mut().map(|t| t.write_all(&frame));
        match result {
            Some(Ok(())) => {
                debug!(command = request.command(), len = frame.len(), "frame sent");
                self.emit_log("INFO", &format!("Sent packet: {}", hex(&frame)));
            }
            Some(Err(err)) => self.handle_io_failure(&err),
            None => {}
        }
    }

    fn pump(&mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        let read = self.transport.as_mut().map(|t| t.read_available(&mut chunk));
        match read {
            Some(Ok(0)) | None => {}
            Some(Ok(count)) => self.rx_buffer.extend_from_slice(&chunk[..count]),
            Some(Err(err)) => {
                self.handle_io_failure(&err);
                return;
            }
        }
        self.drain_frames();
    }

    fn drain_frames(&mut self) {
        loop {
            match protocol::decode(&self.rx_buffer) {
                DecodeOutcome::Complete { packet, consumed } => {
                    self.rx_buffer.advance(consumed);
                    debug!(
                        command = packet.command(),
                        len = packet.payload().len(),
                        "frame decoded"
                    );
                    let _ = self.event_tx.send(Event::Packet(packet));
                }
                DecodeOutcome::Invalid { consumed: 0 } => {
                    // Position 0 is not a frame start; resynchronize on the
                    // next start byte, or purge unrecoverable garbage.
                    if let Some(offset) = self.rx_buffer.iter().position(|&b| b == START_BYTE) {
                        self.rx_buffer.advance(offset);
                    } else {
                        if self.rx_buffer.len() > PURGE_THRESHOLD {
                            warn!(len = self.rx_buffer.len(), "no frame start found, purging buffer");
                            self.rx_buffer.clear();
                        }
                        break;
                    }
                }
                DecodeOutcome::Invalid { consumed } => {
                    self.rx_buffer.advance(consumed);
                    warn!(discarded = consumed, "checksum mismatch");
                    self.emit_log(
                        "ERROR",
                        &format!("Checksum mismatch, discarded {consumed}-byte frame."),
                    );
                }
                DecodeOutcome::Incomplete => break,
            }
        }
    }

    fn handle_io_failure(&mut self, err: &std::io::Error) {
        error!(%err, "serial I/O failure");
        self.emit_log("ERROR", &format!("Serial error: {err}"));
        self.transport = None;
        self.state.set(ConnectionState::Disconnected);
        let _ = self.event_tx.send(Event::Disconnected);
    }

    fn emit_log(&self, level: &str, message: &str) {
        let _ = self.event_tx.send(Event::Log(format!("[{level}] {message}")));
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
