//! Gamepad bindings
//!
//! Axis and button indices for the Logitech gamepad used by the operators.
//! Swap this module out to support a different controller layout.

// ------------------------------------------------------------------------------------------------
// AXES
// ------------------------------------------------------------------------------------------------

/// Left stick horizontal: turn.
pub const TURN_AXIS: usize = 0;

/// Right stick horizontal: horizontal (strafe) drive.
pub const HORIZONTAL_AXIS: usize = 3;

/// Right stick vertical: forward drive.
pub const FORWARD_AXIS: usize = 4;

// ------------------------------------------------------------------------------------------------
// BUTTONS
// ------------------------------------------------------------------------------------------------

pub const A_BUTTON: usize = 0;
pub const B_BUTTON: usize = 1;
pub const X_BUTTON: usize = 2;
pub const Y_BUTTON: usize = 3;
pub const LEFT_BUMPER: usize = 4;
pub const RIGHT_BUMPER: usize = 5;
pub const BACK_BUTTON: usize = 6;
pub const START_BUTTON: usize = 7;
pub const CENTRE_BUTTON: usize = 8;
pub const LEFT_STICK_BUTTON: usize = 9;
pub const RIGHT_STICK_BUTTON: usize = 10;
