//! End-to-end driver tests over an in-test transport

use jog_pendant::hid::protocol::{DISPLAY_REPORT_COUNT, INPUT_HEADER, PRODUCT_ID, VENDOR_ID};
use jog_pendant::hid::{HidDeviceDescriptor, HidTransport};
use jog_pendant::{
    Button, Config, ConnectionState, DisplayUpdate, PendantDriver, PendantError, PendantEvent,
    Result,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One-node transport: queued input frames, recorded feature reports
#[derive(Default)]
struct LoopbackTransport {
    frames: Mutex<VecDeque<Vec<u8>>>,
    written: Mutex<Vec<Vec<u8>>>,
    unplugged: Mutex<bool>,
}

impl HidTransport for LoopbackTransport {
    type Handle = ();

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceDescriptor>> {
        Ok(vec![HidDeviceDescriptor::new(vendor_id, product_id, "loopback")])
    }

    fn open(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn read(&self, _handle: &mut (), buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if let Some(frame) = self.frames.lock().pop_front() {
            buf[..frame.len()].copy_from_slice(&frame);
            return Ok(frame.len());
        }
        if *self.unplugged.lock() {
            return Err(PendantError::Transport("unplugged".into()));
        }
        thread::sleep(timeout);
        Ok(0)
    }

    fn send_feature_report(&self, _handle: &mut (), data: &[u8]) -> Result<()> {
        self.written.lock().push(data.to_vec());
        Ok(())
    }

    fn close(&self, _handle: ()) {}
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.connection.read_timeout_ms = 2;
    config
}

#[test]
fn test_discover_open_receive_write_close() {
    let transport = Arc::new(LoopbackTransport::default());
    transport
        .frames
        .lock()
        .push_back(vec![INPUT_HEADER, 0, 0x03, 0, 0x0D, 0x11, 0x02, 0]);

    let driver = PendantDriver::with_transport(Arc::clone(&transport), test_config());
    let pendants = driver.discover().unwrap();
    assert_eq!(pendants.len(), 1);
    assert_eq!(pendants[0].read.vendor_id, VENDOR_ID);
    assert_eq!(pendants[0].read.product_id, PRODUCT_ID);

    let (mut connection, mut events) = driver.open(pendants[0].clone()).unwrap();
    assert_eq!(connection.state(), ConnectionState::Open);

    let event = tokio_test::block_on(events.recv()).unwrap();
    match event {
        PendantEvent::Input(state) => {
            assert_eq!(state.button, Button::StartPause);
            assert_eq!(state.jog, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }

    connection
        .update_display(DisplayUpdate::with_coordinates(1.0, 2.0, 3.0))
        .unwrap();
    assert_eq!(transport.written.lock().len(), DISPLAY_REPORT_COUNT);

    connection.close();
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert_eq!(
        connection.update_display(DisplayUpdate::default()),
        Err(PendantError::NotConnected)
    );
    assert_eq!(transport.written.lock().len(), DISPLAY_REPORT_COUNT);
}

#[test]
fn test_unplug_ends_stream_with_one_error() {
    let transport = Arc::new(LoopbackTransport::default());
    *transport.unplugged.lock() = true;

    let driver = PendantDriver::with_transport(Arc::clone(&transport), test_config());
    let (connection, mut events) = driver.open_first().unwrap();

    let first = tokio_test::block_on(events.recv());
    assert!(matches!(first, Some(PendantEvent::Disconnected { .. })));
    assert_eq!(tokio_test::block_on(events.recv()), None);
    assert_eq!(connection.state(), ConnectionState::Closed);
}
