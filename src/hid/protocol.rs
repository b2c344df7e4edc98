//! HID protocol definitions for the WHB04B pendant family
//!
//! Input report (8 bytes, device → host):
//! - Byte 0: header (0x04)
//! - Byte 1: rotating seed (ignored)
//! - Bytes 2-3: button codes
//! - Byte 4: feed/step selector code
//! - Byte 5: axis selector code
//! - Byte 6: jog delta (two's complement)
//! - Byte 7: checksum (not validated)
//!
//! Display payload (host → device) is sent as feature reports, see
//! [`super::commands`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// USB Vendor ID of the pendant family
pub const VENDOR_ID: u16 = 0x10CE;

/// USB Product ID of the pendant family
pub const PRODUCT_ID: u16 = 0xEB93;

/// First byte of every valid input report
pub const INPUT_HEADER: u8 = 0x04;

/// Input report size in bytes
pub const INPUT_REPORT_SIZE: usize = 8;

/// Report ID prepended to every display output report
pub const DISPLAY_REPORT_ID: u8 = 0x06;

/// Magic header at the start of the display payload
pub const DISPLAY_MAGIC: [u8; 3] = [0xFE, 0xFD, 0x0C];

/// Number of output reports per display update
pub const DISPLAY_REPORT_COUNT: usize = 3;

/// Payload bytes carried by each output report (after the report ID)
pub const DISPLAY_CHUNK_SIZE: usize = 7;

/// Full size of one output report including the report ID
pub const DISPLAY_REPORT_SIZE: usize = DISPLAY_CHUNK_SIZE + 1;

/// Length of the logical display payload
pub const DISPLAY_PAYLOAD_SIZE: usize = DISPLAY_REPORT_COUNT * DISPLAY_CHUNK_SIZE;

/// Pendant buttons, including the Fn-paired macro meanings.
///
/// `Macro1`..`Macro15` (except `Macro10`) never come off the wire; they are
/// produced by the interpreter when a dual-label button is resolved to its
/// paired meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    None,
    Reset,
    Stop,
    StartPause,
    FeedPlus,
    FeedMinus,
    SpindlePlus,
    SpindleMinus,
    MachineHome,
    SafeZ,
    WorkpieceHome,
    SpindleOnOff,
    Fn,
    ProbeZ,
    Continuous,
    Step,
    Macro1,
    Macro2,
    Macro3,
    Macro4,
    Macro5,
    Macro6,
    Macro7,
    Macro8,
    Macro9,
    Macro10,
    Macro11,
    Macro12,
    Macro13,
    Macro14,
    Macro15,
}

impl Button {
    /// Parse a button from its wire code; unknown codes map to `None`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Button::None,
            0x01 => Button::Reset,
            0x02 => Button::Stop,
            0x03 => Button::StartPause,
            0x04 => Button::FeedPlus,
            0x05 => Button::FeedMinus,
            0x06 => Button::SpindlePlus,
            0x07 => Button::SpindleMinus,
            0x08 => Button::MachineHome,
            0x09 => Button::SafeZ,
            0x0A => Button::WorkpieceHome,
            0x0B => Button::SpindleOnOff,
            0x0C => Button::Fn,
            0x0D => Button::ProbeZ,
            0x0E => Button::Continuous,
            0x0F => Button::Step,
            0x10 => Button::Macro10,
            other => {
                debug!("Unknown button code 0x{:02X}", other);
                Button::None
            }
        }
    }

    /// The meaning printed next to the button when Fn is held.
    ///
    /// Returns `None` for single-label buttons.
    pub fn paired(self) -> Option<Button> {
        match self {
            Button::Reset => Some(Button::Macro11),
            Button::Stop => Some(Button::Macro12),
            Button::StartPause => Some(Button::Macro13),
            Button::FeedPlus => Some(Button::Macro1),
            Button::FeedMinus => Some(Button::Macro2),
            Button::SpindlePlus => Some(Button::Macro3),
            Button::SpindleMinus => Some(Button::Macro4),
            Button::MachineHome => Some(Button::Macro5),
            Button::SafeZ => Some(Button::Macro6),
            Button::WorkpieceHome => Some(Button::Macro7),
            Button::SpindleOnOff => Some(Button::Macro8),
            Button::ProbeZ => Some(Button::Macro9),
            Button::Continuous => Some(Button::Macro14),
            Button::Step => Some(Button::Macro15),
            _ => None,
        }
    }

    /// Whether the button carries two printed functions
    pub fn is_dual_label(self) -> bool {
        self.paired().is_some()
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Axis selector positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Off,
    X,
    Y,
    Z,
    A,
    B,
    C,
}

impl Axis {
    /// Parse an axis from its wire code; unknown codes map to `Off`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x06 => Axis::Off,
            0x11 => Axis::X,
            0x12 => Axis::Y,
            0x13 => Axis::Z,
            0x14 => Axis::A,
            0x15 => Axis::B,
            0x16 => Axis::C,
            other => {
                debug!("Unknown axis code 0x{:02X}", other);
                Axis::Off
            }
        }
    }

    /// Zero-based index into the three displayed coordinates.
    ///
    /// The display shows X/Y/Z or A/B/C depending on the selected axis.
    pub fn display_index(self) -> Option<usize> {
        match self {
            Axis::Off => None,
            Axis::X | Axis::A => Some(0),
            Axis::Y | Axis::B => Some(1),
            Axis::Z | Axis::C => Some(2),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Feed/step rotary selector positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedSelector {
    Step0_001,
    Step0_01,
    Step0_1,
    Step1,
    Percent60,
    Percent100,
    /// Lead / spindle-synchronised jogging
    Lead,
}

impl FeedSelector {
    /// Parse a selector position from its wire code; unknown codes map to `Step0_001`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x0D => FeedSelector::Step0_001,
            0x0E => FeedSelector::Step0_01,
            0x0F => FeedSelector::Step0_1,
            0x10 => FeedSelector::Step1,
            0x1A => FeedSelector::Percent60,
            0x1B => FeedSelector::Percent100,
            0x1C => FeedSelector::Lead,
            other => {
                debug!("Unknown feed selector code 0x{:02X}", other);
                FeedSelector::Step0_001
            }
        }
    }

    /// Jog distance per detent in step mode
    pub fn step_size(self) -> Option<f64> {
        match self {
            FeedSelector::Step0_001 => Some(0.001),
            FeedSelector::Step0_01 => Some(0.01),
            FeedSelector::Step0_1 => Some(0.1),
            FeedSelector::Step1 => Some(1.0),
            _ => None,
        }
    }

    /// Feed override percentage in continuous mode
    pub fn percent(self) -> Option<u8> {
        match self {
            FeedSelector::Percent60 => Some(60),
            FeedSelector::Percent100 => Some(100),
            _ => None,
        }
    }
}

/// Display motion mode (bits 0-1 of the display flags byte)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionMode {
    #[default]
    Continuous = 0,
    Step = 1,
    Mpg = 2,
    Percent = 3,
}

impl MotionMode {
    /// Convert mode to its wire encoding
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionMode::Continuous => "continuous",
            MotionMode::Step => "step",
            MotionMode::Mpg => "mpg",
            MotionMode::Percent => "percent",
        };
        f.write_str(name)
    }
}

/// Coordinate system shown on the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSpace {
    #[default]
    Machine,
    Workpiece,
}

/// Decoded pendant input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendantState {
    pub button: Button,
    pub secondary: Button,
    pub axis: Axis,
    pub feed: FeedSelector,
    /// Jog wheel detents since the previous report; always 0 when axis is off
    pub jog: i8,
}

impl PendantState {
    /// Decode one input report.
    ///
    /// Returns `None` for short frames or frames with the wrong header.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < INPUT_REPORT_SIZE || bytes[0] != INPUT_HEADER {
            return None;
        }

        let axis = Axis::from_byte(bytes[5]);
        let jog = if axis == Axis::Off { 0 } else { bytes[6] as i8 };

        Some(Self {
            button: Button::from_byte(bytes[2]),
            secondary: Button::from_byte(bytes[3]),
            axis,
            feed: FeedSelector::from_byte(bytes[4]),
            jog,
        })
    }
}

impl fmt::Display for PendantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button={} axis={} jog={:+}", self.button, self.axis, self.jog)?;
        if self.secondary != Button::None {
            write!(f, " secondary={}", self.secondary)?;
        }
        match (self.feed.step_size(), self.feed.percent()) {
            (Some(step), _) => write!(f, " step={}", step),
            (_, Some(pct)) => write!(f, " feed={}%", pct),
            _ => write!(f, " feed=lead"),
        }
    }
}

/// Display update data structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayUpdate {
    /// Coordinates for the three display rows
    pub coordinates: [f64; 3],
    /// Feed rate
    pub feed_rate: u16,
    /// Spindle speed
    pub spindle_speed: u16,
    /// Motion mode; replaced by the connection's tracked mode when sent
    pub mode: MotionMode,
    /// Reset indicator
    pub reset: bool,
    /// Machine or workpiece coordinates
    pub space: CoordinateSpace,
}

impl DisplayUpdate {
    /// Create an update showing the given coordinates with everything else zeroed
    pub fn with_coordinates(x: f64, y: f64, z: f64) -> Self {
        Self {
            coordinates: [x, y, z],
            ..Self::default()
        }
    }
}
