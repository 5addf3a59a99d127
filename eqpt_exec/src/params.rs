//! Parameters for the equipment executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::lift::LiftParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EqptExecParams {
    /// Endpoint the command socket binds to.
    pub cmd_endpoint: String,

    /// Endpoint the lift sample publisher binds to.
    pub sample_endpoint: String,

    /// Lift geometry and actuator parameters.
    pub lift: LiftParams,
}
