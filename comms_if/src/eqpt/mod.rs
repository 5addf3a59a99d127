//! # Equipment Commands
//!
//! Typed commands accepted by the equipment executable. Each subsystem
//! endpoint gets its own command enum carrying strongly-typed fields, wrapped
//! in [`EqptCmd`] for transport over the command socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command to one of the equipment subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EqptCmd {
    Drivetrain(DrivetrainCmd),
    Lift(LiftCmd),
    Skimmer(SkimmerCmd),
}

/// Commands accepted by the drivetrain endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DrivetrainCmd {
    /// Drive with the given normalised powers in `[-1, +1]`.
    ///
    /// `forward` is positive towards the front of the robot, `horizontal`
    /// positive to the left, and `turn` positive anticlockwise when viewed
    /// from above.
    Drive {
        forward: f64,
        horizontal: f64,
        turn: f64,
    },

    /// Zero all drive powers, maintaining module angles.
    Stop,
}

/// Commands accepted by the lift (skimmer height adjust) endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LiftCmd {
    /// Move the skimmer to the given height above the lowest position.
    SetHeight { height_m: f64 },

    /// Drive the lift open-loop at the given normalised power.
    SetPower { power: f64 },

    /// Zero power to the lift motor.
    Stop,
}

/// Commands accepted by the skimmer belt endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkimmerCmd {
    /// Run the belt at the given normalised power.
    SetPower { power: f64 },

    /// Start the belt at the given power if it is stopped, stop it otherwise.
    Toggle { power: f64 },

    /// Zero power to the belt.
    Stop,
}

/// Response from the equipment server based on the command sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EqptCmdResponse {
    /// Command was valid and will be executed
    CmdOk,

    /// Command was invalid and has been rejected
    CmdInvalid,

    /// Equipment is invalid so the command cannot be actuated
    EqptInvalid,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Periodic height sample published by the lift subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiftSample {
    /// Measured skimmer height above the lowest position.
    pub height_m: f64,

    /// Time at which the sample was taken.
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EqptCmd {
    /// True if every power or height field in the command is finite and all
    /// normalised powers are within `[-1, +1]`.
    pub fn is_valid(&self) -> bool {
        fn power_ok(p: f64) -> bool {
            p.is_finite() && p.abs() <= 1.0
        }

        match self {
            EqptCmd::Drivetrain(DrivetrainCmd::Drive {
                forward,
                horizontal,
                turn,
            }) => power_ok(*forward) && power_ok(*horizontal) && power_ok(*turn),
            EqptCmd::Drivetrain(DrivetrainCmd::Stop) => true,
            EqptCmd::Lift(LiftCmd::SetHeight { height_m }) => height_m.is_finite(),
            EqptCmd::Lift(LiftCmd::SetPower { power }) => power_ok(*power),
            EqptCmd::Lift(LiftCmd::Stop) => true,
            EqptCmd::Skimmer(SkimmerCmd::SetPower { power })
            | EqptCmd::Skimmer(SkimmerCmd::Toggle { power }) => power_ok(*power),
            EqptCmd::Skimmer(SkimmerCmd::Stop) => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cmd_validity() {
        assert!(EqptCmd::Drivetrain(DrivetrainCmd::Drive {
            forward: 0.5,
            horizontal: -0.25,
            turn: 1.0
        })
        .is_valid());
        assert!(!EqptCmd::Drivetrain(DrivetrainCmd::Drive {
            forward: 1.5,
            horizontal: 0.0,
            turn: 0.0
        })
        .is_valid());
        assert!(!EqptCmd::Skimmer(SkimmerCmd::SetPower { power: f64::NAN }).is_valid());
        assert!(EqptCmd::Lift(LiftCmd::SetHeight { height_m: 0.25 }).is_valid());
        assert!(!EqptCmd::Lift(LiftCmd::SetHeight {
            height_m: f64::INFINITY
        })
        .is_valid());
    }
}
