//! Parameters for the control executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CtrlExecParams {
    /// Endpoint of the equipment server's command socket.
    pub eqpt_cmd_endpoint: String,

    /// Endpoint of the equipment server's sample publisher.
    pub eqpt_sample_endpoint: String,

    /// Endpoint of the joystick driver's publisher.
    pub joy_endpoint: String,

    /// Endpoint of the navigation service.
    pub nav_endpoint: String,

    /// Endpoint of the vision (field-calibration) service.
    pub vision_endpoint: String,

    /// Endpoint this executable's telemetry is published on.
    pub tm_endpoint: String,

    /// Lift height goal is reached within this threshold.
    pub lift_goal_threshold_m: f64,

    /// Belt power used by the teleop toggle and reverse buttons.
    pub teleop_belt_power: f64,

    /// Lift power used by the manual raise/lower buttons.
    pub lift_manual_power: f64,
}
