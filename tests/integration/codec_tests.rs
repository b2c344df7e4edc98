//! Codec integration tests

use jog_pendant::hid::commands::{chunk, encode_coordinate, encode_display_payload};
use jog_pendant::hid::protocol::{
    DISPLAY_PAYLOAD_SIZE, DISPLAY_REPORT_COUNT, DISPLAY_REPORT_ID, INPUT_HEADER,
};
use jog_pendant::{Axis, CoordinateSpace, DisplayUpdate, MotionMode, PendantState};

#[test]
fn test_decode_never_fails_with_valid_header() {
    for code in 0..=255u8 {
        let frame = [INPUT_HEADER, code, code, code, code, code, code, code];
        let state = PendantState::decode(&frame).expect("valid header must decode");
        if state.axis == Axis::Off {
            assert_eq!(state.jog, 0);
        }
    }
}

#[test]
fn test_decode_rejects_every_other_header() {
    for header in (0..=255u8).filter(|h| *h != INPUT_HEADER) {
        let frame = [header, 0, 0x01, 0, 0x0D, 0x11, 1, 0];
        assert_eq!(PendantState::decode(&frame), None);
    }
}

#[test]
fn test_coordinate_known_values() {
    assert_eq!(encode_coordinate(-1234.5678), [0xD2, 0x04, 0x2E, 0x96]);
    assert_eq!(encode_coordinate(0.0), [0, 0, 0, 0]);
    assert_eq!(encode_coordinate(-0.0), [0, 0, 0, 0]);
}

#[test]
fn test_payload_round_trip() {
    let updates = [
        DisplayUpdate::default(),
        DisplayUpdate::with_coordinates(-1234.5678, 0.0001, 999.9999),
        DisplayUpdate {
            coordinates: [12.5, -7.25, 0.0],
            feed_rate: u16::MAX,
            spindle_speed: 18000,
            mode: MotionMode::Percent,
            reset: true,
            space: CoordinateSpace::Workpiece,
        },
    ];

    for update in updates {
        let payload = encode_display_payload(&update);
        let reports = chunk(&payload);
        assert_eq!(reports.len(), DISPLAY_REPORT_COUNT);

        let mut joined = Vec::new();
        for report in &reports {
            assert_eq!(report.report_id(), DISPLAY_REPORT_ID);
            joined.extend_from_slice(report.payload());
        }
        joined.truncate(DISPLAY_PAYLOAD_SIZE);
        assert_eq!(joined, payload.to_vec());
    }
}
