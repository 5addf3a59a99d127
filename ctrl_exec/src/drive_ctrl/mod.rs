//! Drive control module
//!
//! Converts raw joystick axis values into rate-limited drivetrain commands.
//! Raw input is scaled by the configured maximum powers and then slew-limited
//! per axis, so that a stick flick cannot demand an abrupt torque step from
//! the drivetrain.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of drive axes (forward, horizontal, turn).
pub const NUM_DRIVE_AXES: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during drive control processing.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Recieved a non-finite axis value: {0}")]
    NonFiniteAxis(f64),
}
