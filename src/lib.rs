//! Jog Pendant Driver
//!
//! Host-side driver for XHC WHB04B-style USB-HID CNC jog pendants.
//!
//! # Features
//! - Decodes 8-byte pendant input reports into structured button/axis/jog state
//! - Resolves the Fn modifier on dual-label buttons
//! - Tracks the display motion mode and re-sends the display when it changes
//! - Pairs read and write device nodes on platforms that split the pendant
//! - Runs the blocking read loop on a dedicated thread behind an event stream
//! - Encodes coordinates, feed rate and spindle speed for the pendant display

pub mod core;
pub mod hid;

pub use core::config::Config;
pub use core::error::{PendantError, Result};
pub use core::events::{EventStream, PendantEvent};
pub use hid::{
    Axis, Button, ConnectionState, CoordinateSpace, DisplayUpdate, FeedSelector, MotionMode,
    PendantConnection, PendantDriver, PendantEndpointPair, PendantState,
};
