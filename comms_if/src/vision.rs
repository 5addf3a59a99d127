//! # Field-calibration service protocol
//!
//! The vision pipeline exposes a single "detect the field markers and reset
//! odometry" operation, consumed over a REQ/REP socket. The detection itself
//! (camera handling, marker identification) is opaque to this interface.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request sent to the vision service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum VisionRequest {
    /// Attempt one detection of the field markers, resetting the odometry
    /// origin on success.
    DetectAndResetOdometry,
}

/// A response from the vision service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum VisionResponse {
    /// Result of a detection attempt.
    Detect { success: bool },
}
