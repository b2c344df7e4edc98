//! Input interpretation: Fn modifier resolution and motion mode tracking

use super::protocol::{Button, DisplayUpdate, MotionMode, PendantState};
use tracing::debug;

/// Resolve the raw button pair into a single reported button.
///
/// With `fn_inverted` set, dual-label buttons report their printed meaning
/// when pressed alone and their paired meaning with Fn. Without it the
/// roles are swapped. The secondary slot is always `Button::None` on return.
pub fn interpret(raw: PendantState, fn_inverted: bool) -> PendantState {
    let (fn_held, partner) = match (raw.button, raw.secondary) {
        (Button::Fn, other) => (true, other),
        (other, Button::Fn) => (true, other),
        (Button::None, other) => (false, other),
        (other, _) => (false, other),
    };

    let button = if fn_held && partner == Button::None {
        Button::Fn
    } else {
        // Fn flips whichever meaning the button would have alone
        let use_paired = fn_held == fn_inverted;
        match partner.paired() {
            Some(paired) if use_paired => paired,
            _ => partner,
        }
    };

    PendantState {
        button,
        secondary: Button::None,
        ..raw
    }
}

/// Per-connection motion mode and last display update
#[derive(Debug, Clone, Default)]
pub struct MotionTracker {
    mode: MotionMode,
    last_update: Option<DisplayUpdate>,
}

impl MotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently tracked mode
    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    /// Most recently submitted update, with the tracked mode applied
    pub fn last_update(&self) -> Option<DisplayUpdate> {
        self.last_update
    }

    /// Update the mode from an interpreted packet.
    ///
    /// Returns the update to re-send when the mode changed and an update
    /// has been submitted before.
    pub fn track(&mut self, state: &PendantState) -> Option<DisplayUpdate> {
        let mode = match state.button {
            Button::Continuous => MotionMode::Continuous,
            Button::Step => MotionMode::Step,
            _ => return None,
        };
        self.set_mode(mode)
    }

    /// Set the mode directly, with the same re-send rule as [`track`](Self::track)
    pub fn set_mode(&mut self, mode: MotionMode) -> Option<DisplayUpdate> {
        if mode == self.mode {
            return None;
        }
        debug!("Motion mode changed: {} -> {}", self.mode, mode);
        self.mode = mode;

        let update = self.last_update.as_mut()?;
        update.mode = mode;
        Some(*update)
    }

    /// Forget the last update, keeping the mode
    pub fn clear_update(&mut self) {
        self.last_update = None;
    }

    /// Record a caller update and return it with the tracked mode substituted
    pub fn record(&mut self, update: DisplayUpdate) -> DisplayUpdate {
        let update = DisplayUpdate {
            mode: self.mode,
            ..update
        };
        self.last_update = Some(update);
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::protocol::{Axis, FeedSelector};

    fn raw(button: Button, secondary: Button) -> PendantState {
        PendantState {
            button,
            secondary,
            axis: Axis::X,
            feed: FeedSelector::Step0_01,
            jog: 1,
        }
    }

    #[test]
    fn test_fn_symmetry_inverted() {
        let alone = interpret(raw(Button::FeedPlus, Button::None), true);
        assert_eq!(alone.button, Button::FeedPlus);
        let with_fn = interpret(raw(Button::Fn, Button::FeedPlus), true);
        assert_eq!(with_fn.button, Button::Macro1);
    }

    #[test]
    fn test_fn_symmetry_not_inverted() {
        let alone = interpret(raw(Button::FeedPlus, Button::None), false);
        assert_eq!(alone.button, Button::Macro1);
        let with_fn = interpret(raw(Button::FeedPlus, Button::Fn), false);
        assert_eq!(with_fn.button, Button::FeedPlus);
    }

    #[test]
    fn test_fn_alone_is_reported() {
        for inverted in [true, false] {
            let state = interpret(raw(Button::Fn, Button::None), inverted);
            assert_eq!(state.button, Button::Fn);
            assert_eq!(state.secondary, Button::None);
            let state = interpret(raw(Button::None, Button::Fn), inverted);
            assert_eq!(state.button, Button::Fn);
        }
    }

    #[test]
    fn test_single_label_passes_through() {
        for inverted in [true, false] {
            assert_eq!(
                interpret(raw(Button::Macro10, Button::None), inverted).button,
                Button::Macro10
            );
            assert_eq!(
                interpret(raw(Button::Fn, Button::Macro10), inverted).button,
                Button::Macro10
            );
        }
    }

    #[test]
    fn test_no_button() {
        let state = interpret(raw(Button::None, Button::None), false);
        assert_eq!(state.button, Button::None);
        assert_eq!(state.secondary, Button::None);
    }

    #[test]
    fn test_secondary_only_is_promoted() {
        let state = interpret(raw(Button::None, Button::Stop), true);
        assert_eq!(state.button, Button::Stop);
        assert_eq!(state.secondary, Button::None);
    }

    #[test]
    fn test_two_regular_buttons_report_first() {
        let state = interpret(raw(Button::Reset, Button::Stop), true);
        assert_eq!(state.button, Button::Reset);
        assert_eq!(state.secondary, Button::None);
    }

    #[test]
    fn test_interpret_keeps_axis_and_jog() {
        let state = interpret(raw(Button::Fn, Button::Reset), true);
        assert_eq!(state.axis, Axis::X);
        assert_eq!(state.feed, FeedSelector::Step0_01);
        assert_eq!(state.jog, 1);
    }

    #[test]
    fn test_track_without_prior_update() {
        let mut tracker = MotionTracker::new();
        assert_eq!(tracker.track(&raw(Button::Step, Button::None)), None);
        assert_eq!(tracker.mode(), MotionMode::Step);
    }

    #[test]
    fn test_track_resends_once_per_change() {
        let mut tracker = MotionTracker::new();
        tracker.record(DisplayUpdate::with_coordinates(1.0, 2.0, 3.0));

        let resend = tracker.track(&raw(Button::Step, Button::None)).unwrap();
        assert_eq!(resend.mode, MotionMode::Step);
        assert_eq!(resend.coordinates, [1.0, 2.0, 3.0]);

        assert_eq!(tracker.track(&raw(Button::Step, Button::None)), None);
        assert_eq!(tracker.track(&raw(Button::Reset, Button::None)), None);

        let resend = tracker.track(&raw(Button::Continuous, Button::None)).unwrap();
        assert_eq!(resend.mode, MotionMode::Continuous);
    }

    #[test]
    fn test_record_overrides_caller_mode() {
        let mut tracker = MotionTracker::new();
        tracker.set_mode(MotionMode::Step);
        let sent = tracker.record(DisplayUpdate {
            mode: MotionMode::Percent,
            ..DisplayUpdate::default()
        });
        assert_eq!(sent.mode, MotionMode::Step);
        assert_eq!(tracker.last_update().unwrap().mode, MotionMode::Step);
    }

    #[test]
    fn test_clear_update_keeps_mode() {
        let mut tracker = MotionTracker::new();
        tracker.set_mode(MotionMode::Step);
        tracker.record(DisplayUpdate::default());
        tracker.clear_update();

        assert_eq!(tracker.mode(), MotionMode::Step);
        assert_eq!(tracker.last_update(), None);
        assert_eq!(tracker.set_mode(MotionMode::Mpg), None);
    }
}
