//! HID module - USB HID communication with the jog pendant

pub mod commands;
mod device;
pub mod interpreter;
pub mod pairing;
pub mod protocol;
pub mod transport;

#[cfg(any(test, feature = "mock-hid"))]
pub mod mock;

pub use device::{ConnectionState, PendantConnection, PendantDriver};
pub use pairing::PendantEndpointPair;
pub use protocol::{
    Axis, Button, CoordinateSpace, DisplayUpdate, FeedSelector, MotionMode, PendantState,
};
pub use transport::{HidApiTransport, HidDeviceDescriptor, HidTransport};
