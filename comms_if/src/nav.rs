//! # Navigation service protocol
//!
//! The navigation engine is an external service consumed over a REQ/REP
//! socket. Starting a goal returns a task id; the caller then polls the task
//! status until the service reports the outcome. The engine's internals
//! (planning, obstacle handling) are opaque to this interface.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 2D pose in the field frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position in the field frame.
    pub position_m: Point2<f64>,

    /// Heading, anticlockwise from the field frame x axis.
    pub yaw_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A goal that the navigation service can execute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NavGoal {
    /// Navigate to the given pose in the field frame.
    GoToPose(Pose2),

    /// Drive on the current heading for the given distance at the given
    /// speed. Negative distances drive backwards.
    DriveOnHeading { distance_m: f64, speed_ms: f64 },

    /// Spin on the spot by the given angle, positive anticlockwise.
    Spin { angle_rad: f64 },
}

/// A request sent to the navigation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NavRequest {
    /// Start executing the given goal.
    Start(NavGoal),

    /// Query the status of a previously started task.
    Status { task_id: u64 },
}

/// A response from the navigation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NavResponse {
    /// The goal was accepted and assigned the given task id.
    Accepted { task_id: u64 },

    /// The queried task is still executing.
    Pending,

    /// The queried task has finished with the given outcome.
    Done(NavOutcome),

    /// The request could not be handled (unknown task id, or a new goal was
    /// sent while one was already executing).
    Rejected,
}

/// Terminal outcome of a navigation task.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum NavOutcome {
    Succeeded,
    Failed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Point2::new(x_m, y_m),
            yaw_rad,
        }
    }
}
