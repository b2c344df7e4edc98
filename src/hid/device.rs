//! Pendant discovery and connection management

use super::commands::{self, OutputReport};
use super::interpreter::{interpret, MotionTracker};
use super::pairing::{self, PendantEndpointPair};
use super::protocol::{DisplayUpdate, MotionMode, PendantState, INPUT_REPORT_SIZE};
use super::transport::{HidApiTransport, HidTransport};
use crate::core::config::{Config, ConnectionConfig};
use crate::core::error::{PendantError, Result};
use crate::core::events::{EventStream, PendantEvent, WorkerCommand, WorkerStatus};
use parking_lot::{Mutex, MutexGuard};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc as event_mpsc;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`PendantConnection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Entry point: discovers pendants and opens connections to them
pub struct PendantDriver<T: HidTransport> {
    transport: Arc<T>,
    config: Config,
}

impl PendantDriver<HidApiTransport> {
    /// Create a driver backed by the native HID library
    pub fn new(config: Config) -> Result<Self> {
        let transport = HidApiTransport::new()?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }
}

impl<T: HidTransport> PendantDriver<T> {
    pub fn with_transport(transport: Arc<T>, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// List attached pendants
    pub fn discover(&self) -> Result<Vec<PendantEndpointPair>> {
        let descriptors = self
            .transport
            .enumerate(self.config.hid.vendor_id, self.config.hid.product_id)?;
        debug!("Enumerated {} pendant device node(s)", descriptors.len());

        let pendants = pairing::resolve(self.transport.as_ref(), descriptors, &self.config.hid);
        info!("Discovered {} pendant(s)", pendants.len());
        Ok(pendants)
    }

    /// Open a connection to a discovered pendant
    pub fn open(
        &self,
        pendant: PendantEndpointPair,
    ) -> Result<(PendantConnection<T>, EventStream)> {
        let mut connection = PendantConnection::new(
            Arc::clone(&self.transport),
            pendant,
            self.config.connection.clone(),
        );
        let events = connection.open()?;
        Ok((connection, events))
    }

    /// Discover and open the first attached pendant
    pub fn open_first(&self) -> Result<(PendantConnection<T>, EventStream)> {
        let pendant = self
            .discover()?
            .into_iter()
            .next()
            .ok_or(PendantError::DeviceNotFound {
                vendor_id: self.config.hid.vendor_id,
                product_id: self.config.hid.product_id,
            })?;
        self.open(pendant)
    }
}

/// State shared between the caller and the read worker for one open cycle
struct Link<T: HidTransport> {
    transport: Arc<T>,
    /// Read and write go through the read handle
    shared: bool,
    state: Mutex<ConnectionState>,
    /// Owned by the connection, outlives the link
    tracker: Arc<Mutex<MotionTracker>>,
    read: Mutex<Option<T::Handle>>,
    write: Mutex<Option<T::Handle>>,
}

impl<T: HidTransport> Link<T> {
    fn new(transport: Arc<T>, shared: bool, tracker: Arc<Mutex<MotionTracker>>) -> Self {
        Self {
            transport,
            shared,
            state: Mutex::new(ConnectionState::Closed),
            tracker,
            read: Mutex::new(None),
            write: Mutex::new(None),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn write_slot(&self) -> &Mutex<Option<T::Handle>> {
        if self.shared {
            &self.read
        } else {
            &self.write
        }
    }

    /// Write reports to the write handle. Caller holds the tracker lock.
    fn write_reports(&self, reports: &[OutputReport]) -> Result<()> {
        let mut slot = self.write_slot().lock();
        let handle = slot.as_mut().ok_or(PendantError::NotConnected)?;
        for report in reports {
            self.transport.send_feature_report(handle, report.as_bytes())?;
        }
        trace!("Wrote {} display report(s)", reports.len());
        Ok(())
    }

    fn submit(&self, update: DisplayUpdate) -> Result<()> {
        if self.state() != ConnectionState::Open {
            return Err(PendantError::NotConnected);
        }
        let mut tracker = self.tracker.lock();
        let update = tracker.record(update);
        self.write_reports(&commands::build_display_update(&update))
    }

    fn set_motion_mode(&self, mode: MotionMode) -> Result<()> {
        let mut tracker = self.tracker.lock();
        match tracker.set_mode(mode) {
            Some(update) if self.state() == ConnectionState::Open => {
                self.write_reports(&commands::build_display_update(&update))
            }
            _ => Ok(()),
        }
    }

    /// Decode, interpret and publish one input report
    fn handle_packet(
        &self,
        bytes: &[u8],
        fn_inverted: bool,
        events: &event_mpsc::UnboundedSender<PendantEvent>,
    ) {
        let Some(raw) = PendantState::decode(bytes) else {
            trace!("Dropping malformed input report: {:02X?}", bytes);
            return;
        };
        let state = interpret(raw, fn_inverted);
        trace!("Pendant input: {}", state);

        let _ = events.send(PendantEvent::Input(state));

        let mut tracker = self.tracker.lock();
        if let Some(update) = tracker.track(&state) {
            debug!("Re-sending display update for mode {}", update.mode);
            if let Err(e) = self.write_reports(&commands::build_display_update(&update)) {
                warn!("Failed to re-send display update: {}", e);
            }
        }
    }

    /// Move to `Closing` if the link is live. Returns false if someone else tears down.
    fn begin_teardown(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ConnectionState::Open | ConnectionState::Opening => {
                *state = ConnectionState::Closing;
                true
            }
            ConnectionState::Closing | ConnectionState::Closed => false,
        }
    }

    /// Close the write handle, then the read handle
    fn release_handles(&self) {
        if !self.shared {
            if let Some(handle) = self.write.lock().take() {
                self.transport.close(handle);
            }
        }
        // Waits for an in-flight read, which is bounded by the read timeout
        if let Some(handle) = self.read.lock().take() {
            self.transport.close(handle);
        }
    }
}

/// Read worker thread and its control channels
struct ReadWorker {
    commands: Sender<WorkerCommand>,
    status: Receiver<WorkerStatus>,
    thread: JoinHandle<()>,
}

impl ReadWorker {
    fn spawn<T: HidTransport>(
        link: Arc<Link<T>>,
        read_path: String,
        config: ConnectionConfig,
        events: event_mpsc::UnboundedSender<PendantEvent>,
    ) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (status_tx, status_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("pendant-reader".to_string())
            .spawn(move || read_loop(link, read_path, config, command_rx, status_tx, events))
            .map_err(|e| PendantError::Transport(format!("failed to spawn read worker: {}", e)))?;

        Ok(Self {
            commands: command_tx,
            status: status_rx,
            thread,
        })
    }

    /// Wait for the start-up acknowledgement
    fn wait_ready(&self, timeout: Duration) -> Result<()> {
        match self.status.recv_timeout(timeout) {
            Ok(WorkerStatus::Ready) => Ok(()),
            Ok(WorkerStatus::Failed(e)) => Err(e),
            Ok(WorkerStatus::Stopped) | Err(RecvTimeoutError::Disconnected) => Err(
                PendantError::Transport("read worker exited during start-up".to_string()),
            ),
            Err(RecvTimeoutError::Timeout) => Err(PendantError::Timeout("read worker start-up")),
        }
    }

    /// Ask the worker to stop and wait up to `timeout` for it.
    ///
    /// A worker that does not acknowledge in time is detached; it exits on
    /// its next iteration once its handle has been revoked.
    fn shutdown(self, timeout: Duration) {
        let _ = self.commands.send(WorkerCommand::Shutdown);

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.status.recv_timeout(remaining) {
                Ok(WorkerStatus::Stopped) | Err(RecvTimeoutError::Disconnected) => {
                    if self.thread.join().is_err() {
                        warn!("Read worker panicked");
                    }
                    debug!("Read worker stopped");
                    return;
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Read worker did not stop within {:?}, detaching it", timeout);
                    return;
                }
            }
        }
    }
}

fn read_loop<T: HidTransport>(
    link: Arc<Link<T>>,
    read_path: String,
    config: ConnectionConfig,
    commands: Receiver<WorkerCommand>,
    status: Sender<WorkerStatus>,
    events: event_mpsc::UnboundedSender<PendantEvent>,
) {
    match link.transport.open(&read_path) {
        Ok(handle) => {
            let state = link.state.lock();
            if *state != ConnectionState::Opening {
                // open() gave up waiting and already released the link
                drop(state);
                debug!("Open abandoned, closing late read handle on {}", read_path);
                link.transport.close(handle);
                return;
            }
            *link.read.lock() = Some(handle);
        }
        Err(e) => {
            let _ = status.send(WorkerStatus::Failed(e));
            return;
        }
    }
    let _ = status.send(WorkerStatus::Ready);
    debug!("Read worker started on {}", read_path);

    let timeout = config.read_timeout();
    let mut buf = [0u8; INPUT_REPORT_SIZE * 8];

    loop {
        match commands.try_recv() {
            Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let result = {
            let mut slot = link.read.lock();
            let Some(handle) = slot.as_mut() else {
                // Handle revoked by close()
                break;
            };
            let result = link.transport.read(handle, &mut buf, timeout);
            // Let a waiting writer in before the next read on a shared handle
            MutexGuard::unlock_fair(slot);
            result
        };

        match result {
            Ok(0) => {}
            Ok(n) => link.handle_packet(&buf[..n], config.fn_inverted, &events),
            Err(e) => {
                warn!("Pendant disconnected: {}", e);
                if link.begin_teardown() {
                    link.release_handles();
                    link.set_state(ConnectionState::Closed);
                }
                let _ = events.send(PendantEvent::Disconnected { error: e });
                break;
            }
        }
    }

    let _ = status.send(WorkerStatus::Stopped);
    debug!("Read worker stopped on {}", read_path);
}

/// One logical pendant connection
pub struct PendantConnection<T: HidTransport> {
    transport: Arc<T>,
    endpoints: PendantEndpointPair,
    config: ConnectionConfig,
    tracker: Arc<Mutex<MotionTracker>>,
    link: Arc<Link<T>>,
    worker: Option<ReadWorker>,
}

impl<T: HidTransport> PendantConnection<T> {
    /// Create a closed connection for a resolved pendant
    pub fn new(
        transport: Arc<T>,
        endpoints: PendantEndpointPair,
        config: ConnectionConfig,
    ) -> Self {
        let tracker = Arc::new(Mutex::new(MotionTracker::new()));
        let link = Arc::new(Link::new(
            Arc::clone(&transport),
            endpoints.is_shared(),
            Arc::clone(&tracker),
        ));
        Self {
            transport,
            endpoints,
            config,
            tracker,
            link,
            worker: None,
        }
    }

    pub fn endpoints(&self) -> &PendantEndpointPair {
        &self.endpoints
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Open the endpoints and start the read worker
    pub fn open(&mut self) -> Result<EventStream> {
        if self.state() != ConnectionState::Closed {
            return Err(PendantError::InvalidState("already open"));
        }
        // Reap a worker left over from a disconnect
        if let Some(worker) = self.worker.take() {
            worker.shutdown(self.config.shutdown_timeout());
        }

        // The mode carries over; content from a previous cycle is not re-sent
        self.tracker.lock().clear_update();
        let link = Arc::new(Link::new(
            Arc::clone(&self.transport),
            self.endpoints.is_shared(),
            Arc::clone(&self.tracker),
        ));
        link.set_state(ConnectionState::Opening);
        self.link = Arc::clone(&link);

        info!(
            "Opening pendant: read={} write={}",
            self.endpoints.read.path, self.endpoints.write.path
        );

        if !link.shared {
            match self.transport.open(&self.endpoints.write.path) {
                Ok(handle) => *link.write.lock() = Some(handle),
                Err(e) => {
                    link.set_state(ConnectionState::Closed);
                    return Err(e);
                }
            }
        }

        let (event_tx, event_rx) = event_mpsc::unbounded_channel();
        let started = ReadWorker::spawn(
            Arc::clone(&link),
            self.endpoints.read.path.clone(),
            self.config.clone(),
            event_tx,
        )
        .and_then(|worker| match worker.wait_ready(self.config.open_timeout()) {
            Ok(()) => Ok(worker),
            Err(e) => {
                worker.shutdown(self.config.shutdown_timeout());
                Err(e)
            }
        });

        match started {
            Ok(worker) => {
                self.worker = Some(worker);
                let mut state = link.state.lock();
                // The worker may already have seen a disconnect
                if *state == ConnectionState::Opening {
                    *state = ConnectionState::Open;
                    info!("Connected to pendant");
                }
                Ok(event_rx)
            }
            Err(e) => {
                warn!("Failed to open pendant: {}", e);
                // Closed first, so a worker still inside open() drops its handle
                link.set_state(ConnectionState::Closed);
                link.release_handles();
                Err(e)
            }
        }
    }

    /// Send a display update.
    ///
    /// The update's mode is replaced by the connection's tracked motion mode.
    pub fn update_display(&self, update: DisplayUpdate) -> Result<()> {
        self.link.submit(update)
    }

    /// Send a reset-flagged update followed by the same update with reset cleared
    pub fn send_reset_sequence(&self, defaults: &DisplayUpdate) -> Result<()> {
        for update in commands::build_reset_sequence(defaults) {
            self.update_display(update)?;
        }
        Ok(())
    }

    /// Currently tracked motion mode
    pub fn motion_mode(&self) -> MotionMode {
        self.tracker.lock().mode()
    }

    /// Override the tracked motion mode, re-sending the last update if it changed.
    ///
    /// While closed only the tracked mode changes; it applies from the next open.
    pub fn set_motion_mode(&self, mode: MotionMode) -> Result<()> {
        self.link.set_motion_mode(mode)
    }

    /// Stop the read worker and close both handles. Idempotent.
    pub fn close(&mut self) {
        let tear_down = self.link.begin_teardown();

        if let Some(worker) = self.worker.take() {
            worker.shutdown(self.config.shutdown_timeout());
        }

        if tear_down {
            self.link.release_handles();
            self.link.set_state(ConnectionState::Closed);
            info!("Disconnected from pendant");
        }
    }
}

impl<T: HidTransport> Drop for PendantConnection<T> {
    fn drop(&mut self) {
        self.close();
    }
}
