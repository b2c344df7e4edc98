//! Fn modifier tests over every dual-label button

use jog_pendant::hid::interpreter::interpret;
use jog_pendant::{Axis, Button, FeedSelector, PendantState};

const DUAL_LABEL: [Button; 14] = [
    Button::Reset,
    Button::Stop,
    Button::StartPause,
    Button::FeedPlus,
    Button::FeedMinus,
    Button::SpindlePlus,
    Button::SpindleMinus,
    Button::MachineHome,
    Button::SafeZ,
    Button::WorkpieceHome,
    Button::SpindleOnOff,
    Button::ProbeZ,
    Button::Continuous,
    Button::Step,
];

fn pressed(button: Button, secondary: Button) -> PendantState {
    PendantState {
        button,
        secondary,
        axis: Axis::Y,
        feed: FeedSelector::Percent60,
        jog: 0,
    }
}

#[test]
fn test_fn_symmetry_for_all_dual_label_buttons() {
    for button in DUAL_LABEL {
        let paired = button.paired().expect("dual-label button has a paired meaning");

        assert_eq!(interpret(pressed(button, Button::None), true).button, button);
        assert_eq!(interpret(pressed(Button::Fn, button), true).button, paired);
        assert_eq!(interpret(pressed(button, Button::None), false).button, paired);
        assert_eq!(interpret(pressed(button, Button::Fn), false).button, button);
    }
}

#[test]
fn test_at_most_one_button_reported() {
    let all = DUAL_LABEL
        .iter()
        .copied()
        .chain([Button::None, Button::Fn, Button::Macro10]);
    for first in all.clone() {
        for second in all.clone() {
            for inverted in [true, false] {
                let state = interpret(pressed(first, second), inverted);
                assert_eq!(state.secondary, Button::None);
            }
        }
    }
}
