//! In-memory HID transport for tests and hardware-free development

use super::transport::{HidDeviceDescriptor, HidTransport};
use crate::core::error::{PendantError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::thread;
use std::time::Duration;

/// Scripted reads for one device path
#[derive(Debug)]
enum ReadStep {
    Frame(Vec<u8>),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    descriptors: Vec<HidDeviceDescriptor>,
    rejects_writes: HashSet<String>,
    unopenable: HashSet<String>,
    open_delays: HashMap<String, Duration>,
    reading: HashSet<String>,
    overlapping_writes: usize,
    reads: HashMap<String, VecDeque<ReadStep>>,
    writes: Vec<(String, Vec<u8>)>,
    opened: Vec<String>,
    closed: Vec<String>,
}

/// Handle returned by [`MockTransport::open`]
#[derive(Debug)]
pub struct MockHandle {
    path: String,
}

impl MockHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Mock transport with scripted descriptors, reads and write acceptance
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device node returned by `enumerate`
    pub fn add_device(&self, descriptor: HidDeviceDescriptor) {
        self.state.lock().descriptors.push(descriptor);
    }

    /// Make feature-report writes to `path` fail
    pub fn reject_writes(&self, path: &str) {
        self.state.lock().rejects_writes.insert(path.to_string());
    }

    /// Make `open` fail for `path`
    pub fn make_unopenable(&self, path: &str) {
        self.state.lock().unopenable.insert(path.to_string());
    }

    /// Make `open` of `path` block for `delay` before succeeding
    pub fn delay_open(&self, path: &str, delay: Duration) {
        self.state.lock().open_delays.insert(path.to_string(), delay);
    }

    /// Queue an input report to be returned by the next read on `path`
    pub fn push_read(&self, path: &str, frame: &[u8]) {
        self.state
            .lock()
            .reads
            .entry(path.to_string())
            .or_default()
            .push_back(ReadStep::Frame(frame.to_vec()));
    }

    /// Queue a read failure (device unplugged) on `path`
    pub fn push_read_error(&self, path: &str, message: &str) {
        self.state
            .lock()
            .reads
            .entry(path.to_string())
            .or_default()
            .push_back(ReadStep::Fail(message.to_string()));
    }

    /// All feature reports written so far, with their target path
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    /// Number of feature reports written so far
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Paths opened, in order
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    /// Paths closed, in order
    pub fn closed(&self) -> Vec<String> {
        self.state.lock().closed.clone()
    }

    /// Writes that arrived while a read was in flight on the same path
    pub fn overlapping_writes(&self) -> usize {
        self.state.lock().overlapping_writes
    }

    /// Whether no scripted reads remain for `path`
    pub fn reads_drained(&self, path: &str) -> bool {
        self.state
            .lock()
            .reads
            .get(path)
            .map_or(true, VecDeque::is_empty)
    }
}

impl HidTransport for MockTransport {
    type Handle = MockHandle;

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceDescriptor>> {
        Ok(self
            .state
            .lock()
            .descriptors
            .iter()
            .filter(|d| d.vendor_id == vendor_id && d.product_id == product_id)
            .cloned()
            .collect())
    }

    fn open(&self, path: &str) -> Result<MockHandle> {
        let delay = self.state.lock().open_delays.get(path).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.unopenable.contains(path) {
            return Err(PendantError::Transport(format!("failed to open {}", path)));
        }
        state.opened.push(path.to_string());
        Ok(MockHandle {
            path: path.to_string(),
        })
    }

    fn read(&self, handle: &mut MockHandle, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let step = {
            let mut state = self.state.lock();
            state.reading.insert(handle.path.clone());
            state.reads.get_mut(&handle.path).and_then(VecDeque::pop_front)
        };

        let result = match step {
            Some(ReadStep::Frame(frame)) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            Some(ReadStep::Fail(message)) => Err(PendantError::Transport(message)),
            None => {
                // Nothing scripted: behave like a real read timing out
                thread::sleep(timeout);
                Ok(0)
            }
        };

        self.state.lock().reading.remove(&handle.path);
        result
    }

    fn send_feature_report(&self, handle: &mut MockHandle, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.rejects_writes.contains(&handle.path) {
            return Err(PendantError::Transport(format!(
                "feature report rejected by {}",
                handle.path
            )));
        }
        if state.reading.contains(&handle.path) {
            state.overlapping_writes += 1;
        }
        state.writes.push((handle.path.clone(), data.to_vec()));
        Ok(())
    }

    fn close(&self, handle: MockHandle) {
        self.state.lock().closed.push(handle.path);
    }
}
