//! HID transport abstraction and the hidapi-backed implementation

use crate::core::error::{PendantError, Result};
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use serde::Serialize;
use std::ffi::CString;
use std::time::Duration;
use tracing::debug;

/// One OS-level HID device node as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HidDeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Platform path used to open the node
    pub path: String,
    pub interface_number: Option<i32>,
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl HidDeviceDescriptor {
    /// Minimal descriptor with only ids and path set
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            interface_number: None,
            usage_page: None,
            usage: None,
            product: None,
            serial_number: None,
        }
    }

    pub fn with_interface(mut self, interface_number: i32) -> Self {
        self.interface_number = Some(interface_number);
        self
    }
}

/// Native HID capability consumed by the resolver and the connection.
///
/// Handles are owned values; a handle is used by at most one thread at a
/// time and is released through [`close`](HidTransport::close).
pub trait HidTransport: Send + Sync + 'static {
    type Handle: Send + 'static;

    /// List device nodes matching the vendor/product id
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceDescriptor>>;

    /// Open a device node by path
    fn open(&self, path: &str) -> Result<Self::Handle>;

    /// Read one input report, waiting up to `timeout`.
    ///
    /// Returns 0 on timeout; errors mean the device is gone.
    fn read(&self, handle: &mut Self::Handle, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Send a feature report; `data[0]` is the report ID
    fn send_feature_report(&self, handle: &mut Self::Handle, data: &[u8]) -> Result<()>;

    /// Release a handle. Failures are swallowed.
    fn close(&self, handle: Self::Handle);
}

/// [`HidTransport`] over the `hidapi` crate
pub struct HidApiTransport {
    api: Mutex<HidApi>,
}

impl HidApiTransport {
    /// Initialize the native HID library
    pub fn new() -> Result<Self> {
        let api = HidApi::new().map_err(PendantError::transport)?;

        // Don't seize the device exclusively on macOS, a second node of the
        // same pendant may need to be opened for writing
        #[cfg(target_os = "macos")]
        {
            api.set_open_exclusive(false);
        }

        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl HidTransport for HidApiTransport {
    type Handle = HidDevice;

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceDescriptor>> {
        let mut api = self.api.lock();
        // Refresh device list to see newly connected devices
        if let Err(e) = api.refresh_devices() {
            debug!("Failed to refresh device list: {}", e);
        }

        let descriptors = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| HidDeviceDescriptor {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                path: d.path().to_string_lossy().into_owned(),
                // hidapi reports -1 when the backend has no interface number
                interface_number: Some(d.interface_number()).filter(|n| *n >= 0),
                usage_page: Some(d.usage_page()).filter(|p| *p != 0),
                usage: Some(d.usage()).filter(|u| *u != 0),
                product: d.product_string().map(str::to_owned),
                serial_number: d.serial_number().map(str::to_owned),
            })
            .collect();

        Ok(descriptors)
    }

    fn open(&self, path: &str) -> Result<HidDevice> {
        let c_path = CString::new(path)
            .map_err(|_| PendantError::Transport(format!("invalid device path: {:?}", path)))?;
        let device = self
            .api
            .lock()
            .open_path(&c_path)
            .map_err(|e| PendantError::Transport(format!("failed to open {}: {}", path, e)))?;
        device
            .set_blocking_mode(true)
            .map_err(PendantError::transport)?;
        Ok(device)
    }

    fn read(&self, handle: &mut HidDevice, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        handle
            .read_timeout(buf, timeout_ms)
            .map_err(|e| PendantError::Transport(format!("HID read error: {}", e)))
    }

    fn send_feature_report(&self, handle: &mut HidDevice, data: &[u8]) -> Result<()> {
        handle
            .send_feature_report(data)
            .map_err(|e| PendantError::Transport(format!("HID feature report rejected: {}", e)))
    }

    fn close(&self, handle: HidDevice) {
        // hidapi closes the native handle on drop
        drop(handle);
    }
}
