//! # Joystick input message
//!
//! Raw gamepad state published by the joystick driver. Axis and button
//! meanings are assigned by the control executable's bindings module, not
//! here, so that different gamepads can be supported by swapping bindings
//! only.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of analogue axes reported by the gamepad.
pub const NUM_AXES: usize = 6;

/// Number of buttons reported by the gamepad.
pub const NUM_BUTTONS: usize = 11;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single joystick state message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JoyMsg {
    /// Analogue axis values in `[-1, +1]`.
    pub axes: [f64; NUM_AXES],

    /// Button levels, `0` released or `1` pressed.
    pub buttons: [u8; NUM_BUTTONS],
}

impl Default for JoyMsg {
    fn default() -> Self {
        Self {
            axes: [0.0; NUM_AXES],
            buttons: [0; NUM_BUTTONS],
        }
    }
}
