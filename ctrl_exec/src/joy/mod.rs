//! # Joystick processing module
//!
//! Converts raw joystick messages into drive axis values and semantic
//! actions. Button actions fire on rising edges only (a held button does not
//! repeat); the one exception is the manual lift control, which commands
//! power while the button is held and stops the lift on release.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod bindings;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::joy::{JoyMsg, NUM_BUTTONS};

use crate::{
    drive_ctrl::RawAxes,
    proc::{states::TravelSite, ProcKind},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Processes joystick messages into axes and actions.
#[derive(Debug, Default)]
pub struct JoyProcessor {
    buttons: ButtonStates,
}

/// Last-observed button levels, used for edge detection.
#[derive(Debug)]
pub struct ButtonStates {
    last: [u8; NUM_BUTTONS],
}

/// Button edges detected in a single message.
#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonEdges {
    pressed: [bool; NUM_BUTTONS],
    released: [bool; NUM_BUTTONS],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A semantic action derived from the joystick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoyAction {
    /// Toggle the skimmer belt at the teleop belt power.
    ToggleBelt,

    /// Run the skimmer belt in reverse.
    ReverseBelt,

    /// Command the lift to the digging height.
    LiftToDigHeight,

    /// Command the lift to the dumping height.
    LiftToDumpHeight,

    /// Drive the lift up at the manual power while held.
    LiftManualRaise,

    /// Drive the lift down at the manual power while held.
    LiftManualLower,

    /// Stop the lift (manual button released).
    LiftManualStop,

    /// Start the given procedure, or cancel it if it is the one running.
    StartOrCancel(ProcKind),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ButtonStates {
    fn default() -> Self {
        Self {
            last: [0; NUM_BUTTONS],
        }
    }
}

impl ButtonStates {
    /// Update the stored levels, returning the edges seen in this message.
    pub fn update(&mut self, buttons: &[u8; NUM_BUTTONS]) -> ButtonEdges {
        let mut edges = ButtonEdges::default();

        for i in 0..NUM_BUTTONS {
            edges.pressed[i] = buttons[i] == 1 && self.last[i] == 0;
            edges.released[i] = buttons[i] == 0 && self.last[i] == 1;
        }

        self.last = *buttons;

        edges
    }
}

impl ButtonEdges {
    pub fn pressed(&self, button: usize) -> bool {
        self.pressed[button]
    }

    pub fn released(&self, button: usize) -> bool {
        self.released[button]
    }
}

impl JoyProcessor {
    /// Process one joystick message into drive axes and semantic actions.
    pub fn proc(&mut self, msg: &JoyMsg) -> (RawAxes, Vec<JoyAction>) {
        use bindings::*;

        let axes = RawAxes {
            forward: msg.axes[FORWARD_AXIS],
            horizontal: msg.axes[HORIZONTAL_AXIS],
            turn: msg.axes[TURN_AXIS],
        };

        let edges = self.buttons.update(&msg.buttons);
        let mut actions = Vec::new();

        // Teleop equipment actions
        if edges.pressed(X_BUTTON) {
            actions.push(JoyAction::ToggleBelt);
        }
        if edges.pressed(Y_BUTTON) {
            actions.push(JoyAction::ReverseBelt);
        }
        if edges.pressed(A_BUTTON) {
            actions.push(JoyAction::LiftToDigHeight);
        }
        if edges.pressed(B_BUTTON) {
            actions.push(JoyAction::LiftToDumpHeight);
        }

        // Manual lift: power while held, stop on release
        if edges.pressed(LEFT_STICK_BUTTON) {
            actions.push(JoyAction::LiftManualRaise);
        } else if edges.released(LEFT_STICK_BUTTON) {
            actions.push(JoyAction::LiftManualStop);
        } else if edges.pressed(RIGHT_STICK_BUTTON) {
            actions.push(JoyAction::LiftManualLower);
        } else if edges.released(RIGHT_STICK_BUTTON) {
            actions.push(JoyAction::LiftManualStop);
        }

        // Procedure start/cancel buttons
        if edges.pressed(START_BUTTON) {
            actions.push(JoyAction::StartOrCancel(ProcKind::Calibrate));
        }
        if edges.pressed(BACK_BUTTON) {
            actions.push(JoyAction::StartOrCancel(ProcKind::Dig));
        }
        if edges.pressed(LEFT_BUMPER) {
            actions.push(JoyAction::StartOrCancel(ProcKind::Offload));
        }
        if edges.pressed(RIGHT_BUMPER) {
            actions.push(JoyAction::StartOrCancel(ProcKind::Cycle));
        }
        if edges.pressed(CENTRE_BUTTON) {
            actions.push(JoyAction::StartOrCancel(ProcKind::Travel(TravelSite::Berm)));
        }

        (axes, actions)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn msg_with_button(button: usize, level: u8) -> JoyMsg {
        let mut msg = JoyMsg::default();
        msg.buttons[button] = level;
        msg
    }

    #[test]
    fn test_rising_edge_fires_once() {
        let mut joy = JoyProcessor::default();

        let (_, actions) = joy.proc(&msg_with_button(bindings::X_BUTTON, 1));
        assert_eq!(actions, vec![JoyAction::ToggleBelt]);

        // Held button does not repeat
        let (_, actions) = joy.proc(&msg_with_button(bindings::X_BUTTON, 1));
        assert!(actions.is_empty());

        // Release produces nothing for plain buttons
        let (_, actions) = joy.proc(&JoyMsg::default());
        assert!(actions.is_empty());

        // A second press fires again
        let (_, actions) = joy.proc(&msg_with_button(bindings::X_BUTTON, 1));
        assert_eq!(actions, vec![JoyAction::ToggleBelt]);
    }

    #[test]
    fn test_manual_lift_stops_on_release() {
        let mut joy = JoyProcessor::default();

        let (_, actions) = joy.proc(&msg_with_button(bindings::LEFT_STICK_BUTTON, 1));
        assert_eq!(actions, vec![JoyAction::LiftManualRaise]);

        let (_, actions) = joy.proc(&JoyMsg::default());
        assert_eq!(actions, vec![JoyAction::LiftManualStop]);
    }

    #[test]
    fn test_axes_mapped_through_bindings() {
        let mut joy = JoyProcessor::default();

        let mut msg = JoyMsg::default();
        msg.axes[bindings::FORWARD_AXIS] = 0.5;
        msg.axes[bindings::HORIZONTAL_AXIS] = -0.25;
        msg.axes[bindings::TURN_AXIS] = 1.0;

        let (axes, _) = joy.proc(&msg);
        assert_eq!(axes.forward, 0.5);
        assert_eq!(axes.horizontal, -0.25);
        assert_eq!(axes.turn, 1.0);
    }

    #[test]
    fn test_procedure_buttons() {
        let mut joy = JoyProcessor::default();

        let (_, actions) = joy.proc(&msg_with_button(bindings::BACK_BUTTON, 1));
        assert_eq!(actions, vec![JoyAction::StartOrCancel(ProcKind::Dig)]);

        let (_, actions) = joy.proc(&msg_with_button(bindings::RIGHT_BUMPER, 1));
        // BACK released and RIGHT_BUMPER pressed in the same message
        assert!(actions.contains(&JoyAction::StartOrCancel(ProcKind::Cycle)));
    }
}
