//! Display payload encoding
//!
//! Payload layout (21 bytes):
//! - Bytes 0-2: magic header `FE FD 0C`
//! - Byte 3: flags (mode, reset, coordinate space)
//! - Bytes 4-15: three 4-byte coordinate blocks
//! - Bytes 16-17: feed rate (LE)
//! - Bytes 18-19: spindle speed (LE)
//! - Byte 20: zero padding
//!
//! The payload is split into `[report id, 7 bytes]` feature reports.

use super::protocol::{
    CoordinateSpace, DisplayUpdate, DISPLAY_CHUNK_SIZE, DISPLAY_MAGIC, DISPLAY_PAYLOAD_SIZE,
    DISPLAY_REPORT_ID, DISPLAY_REPORT_SIZE,
};

/// Reset indicator bit in the flags byte
pub const FLAG_RESET: u8 = 0x40;

/// Workpiece-coordinates bit in the flags byte
pub const FLAG_WORKPIECE: u8 = 0x80;

/// Sign bit inside the high byte of a coordinate's fraction
const SIGN_BIT: u8 = 0x80;

/// One 8-byte display feature report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputReport {
    data: [u8; DISPLAY_REPORT_SIZE],
}

impl OutputReport {
    fn new() -> Self {
        let mut data = [0u8; DISPLAY_REPORT_SIZE];
        data[0] = DISPLAY_REPORT_ID;
        Self { data }
    }

    /// Report ID byte
    pub fn report_id(&self) -> u8 {
        self.data[0]
    }

    /// Payload slice (bytes 1-7)
    pub fn payload(&self) -> &[u8] {
        &self.data[1..]
    }

    /// Raw report data for sending
    pub fn as_bytes(&self) -> &[u8; DISPLAY_REPORT_SIZE] {
        &self.data
    }
}

/// Encode a coordinate as `[int lo, int hi, frac lo, frac hi | sign]`.
///
/// The fraction is expressed in ten-thousandths. Integer parts above
/// `u16::MAX` saturate.
pub fn encode_coordinate(value: f64) -> [u8; 4] {
    let magnitude = value.abs();
    let mut integer = magnitude.trunc();
    let mut fraction = ((magnitude - integer) * 10_000.0).round();
    if fraction >= 10_000.0 {
        integer += 1.0;
        fraction = 0.0;
    }

    let integer = (integer as u16).to_le_bytes();
    let fraction = (fraction as u16).to_le_bytes();
    // -0.0 compares equal to 0.0, so it keeps the sign bit clear
    let sign = if value < 0.0 { SIGN_BIT } else { 0 };

    [integer[0], integer[1], fraction[0], fraction[1] | sign]
}

/// Encode the flags byte: mode in bits 0-1, reset in bit 6, workpiece in bit 7
pub fn encode_flags(update: &DisplayUpdate) -> u8 {
    let mut flags = update.mode.as_byte() & 0x03;
    if update.reset {
        flags |= FLAG_RESET;
    }
    if update.space == CoordinateSpace::Workpiece {
        flags |= FLAG_WORKPIECE;
    }
    flags
}

/// Encode the full logical display payload
pub fn encode_display_payload(update: &DisplayUpdate) -> [u8; DISPLAY_PAYLOAD_SIZE] {
    let mut payload = [0u8; DISPLAY_PAYLOAD_SIZE];
    payload[..3].copy_from_slice(&DISPLAY_MAGIC);
    payload[3] = encode_flags(update);

    for (i, value) in update.coordinates.iter().enumerate() {
        let offset = 4 + i * 4;
        payload[offset..offset + 4].copy_from_slice(&encode_coordinate(*value));
    }

    payload[16..18].copy_from_slice(&update.feed_rate.to_le_bytes());
    payload[18..20].copy_from_slice(&update.spindle_speed.to_le_bytes());
    payload
}

/// Split a payload into report-ID-prefixed output reports.
///
/// The last report is zero-padded when the payload does not divide evenly.
pub fn chunk(payload: &[u8]) -> Vec<OutputReport> {
    payload
        .chunks(DISPLAY_CHUNK_SIZE)
        .map(|part| {
            let mut report = OutputReport::new();
            report.data[1..1 + part.len()].copy_from_slice(part);
            report
        })
        .collect()
}

/// Build the reports for a display update
pub fn build_display_update(update: &DisplayUpdate) -> Vec<OutputReport> {
    chunk(&encode_display_payload(update))
}

/// Build the two updates of a reset sequence: reset set, then cleared
pub fn build_reset_sequence(defaults: &DisplayUpdate) -> [DisplayUpdate; 2] {
    [
        DisplayUpdate {
            reset: true,
            ..*defaults
        },
        DisplayUpdate {
            reset: false,
            ..*defaults
        },
    ]
}

/// Build the report used to probe whether a device node accepts display writes
pub fn build_probe_report() -> OutputReport {
    build_display_update(&DisplayUpdate::default())[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::protocol::MotionMode;

    fn reassemble(reports: &[OutputReport]) -> Vec<u8> {
        let mut bytes: Vec<u8> = reports.iter().flat_map(|r| r.payload().to_vec()).collect();
        bytes.truncate(DISPLAY_PAYLOAD_SIZE);
        bytes
    }

    #[test]
    fn test_encode_negative_coordinate() {
        assert_eq!(encode_coordinate(-1234.5678), [0xD2, 0x04, 0x2E, 0x96]);
    }

    #[test]
    fn test_encode_positive_coordinate() {
        assert_eq!(encode_coordinate(1234.5678), [0xD2, 0x04, 0x2E, 0x16]);
        assert_eq!(encode_coordinate(1.5), [0x01, 0x00, 0x88, 0x13]);
    }

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode_coordinate(0.0), [0, 0, 0, 0]);
        assert_eq!(encode_coordinate(-0.0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_fraction_carry() {
        // 0.99996 rounds to 10000 ten-thousandths
        assert_eq!(encode_coordinate(2.99996), [0x03, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_small_negative_sets_sign() {
        assert_eq!(encode_coordinate(-0.5), [0x00, 0x00, 0x88, 0x93]);
    }

    #[test]
    fn test_encode_flags() {
        let mut update = DisplayUpdate::default();
        assert_eq!(encode_flags(&update), 0x00);

        update.mode = MotionMode::Percent;
        assert_eq!(encode_flags(&update), 0x03);

        update.reset = true;
        assert_eq!(encode_flags(&update), 0x43);

        update.space = CoordinateSpace::Workpiece;
        update.mode = MotionMode::Step;
        assert_eq!(encode_flags(&update), 0xC1);
    }

    #[test]
    fn test_encode_payload_layout() {
        let update = DisplayUpdate {
            coordinates: [1.5, -1234.5678, 0.0],
            feed_rate: 0x1234,
            spindle_speed: 12000,
            mode: MotionMode::Mpg,
            reset: false,
            space: CoordinateSpace::Workpiece,
        };
        let payload = encode_display_payload(&update);
        assert_eq!(&payload[..3], &[0xFE, 0xFD, 0x0C]);
        assert_eq!(payload[3], 0x82);
        assert_eq!(&payload[4..8], &[0x01, 0x00, 0x88, 0x13]);
        assert_eq!(&payload[8..12], &[0xD2, 0x04, 0x2E, 0x96]);
        assert_eq!(&payload[12..16], &[0, 0, 0, 0]);
        assert_eq!(&payload[16..18], &[0x34, 0x12]);
        assert_eq!(&payload[18..20], &12000u16.to_le_bytes());
        assert_eq!(payload[20], 0);
    }

    #[test]
    fn test_chunk_round_trip() {
        let update = DisplayUpdate {
            coordinates: [-12.25, 300.0001, 65535.9],
            feed_rate: 1500,
            spindle_speed: 24000,
            mode: MotionMode::Step,
            reset: true,
            space: CoordinateSpace::Machine,
        };
        let payload = encode_display_payload(&update);
        let reports = chunk(&payload);
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.report_id() == DISPLAY_REPORT_ID));
        assert_eq!(reassemble(&reports), payload.to_vec());
    }

    #[test]
    fn test_chunk_pads_last_report() {
        let reports = chunk(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].as_bytes(), &[DISPLAY_REPORT_ID, 8, 9, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reset_sequence() {
        let defaults = DisplayUpdate::with_coordinates(1.0, 2.0, 3.0);
        let [first, second] = build_reset_sequence(&defaults);
        assert!(first.reset);
        assert!(!second.reset);
        assert_eq!(first.coordinates, defaults.coordinates);
        assert_eq!(second.coordinates, defaults.coordinates);
    }

    #[test]
    fn test_probe_report() {
        let probe = build_probe_report();
        assert_eq!(probe.as_bytes(), &[DISPLAY_REPORT_ID, 0xFE, 0xFD, 0x0C, 0, 0, 0, 0]);
    }
}
