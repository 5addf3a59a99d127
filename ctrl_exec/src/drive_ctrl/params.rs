//! Parameters for the drive control module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Maximum duty cycle commanded for the forward and horizontal axes.
    pub max_drive_power: f64,

    /// Maximum duty cycle commanded for the turn axis.
    pub max_turn_power: f64,

    /// Maximum rate of change of each axis output, in duty cycle per second.
    pub max_rate_per_s: f64,

    /// Axis targets closer to the current output than this are treated as
    /// already reached and do not move the output.
    pub axis_deadzone: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_drive_power: 1.0,
            max_turn_power: 1.0,
            max_rate_per_s: 2.0,
            axis_deadzone: 0.01,
        }
    }
}
