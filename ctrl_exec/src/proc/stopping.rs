//! # [`Stopping`] procedure state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{DrivetrainCmd, EqptCmd, LiftCmd, SkimmerCmd};

use super::{params::ProcParams, ProcCtx, ProcInputs, StackAction, StepOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cleanup state run at the end of every procedure.
///
/// Commands the safe stop, zeroing power to the drivetrain, lift, and skimmer
/// belt, then pops itself. The stop commands are idempotent so it does not
/// matter whether the subsystems were already stopped, or whether a command
/// issued before a cancellation is still in flight.
///
/// Cancellation is ignored here: this state IS the cleanup, and it must
/// complete on every exit path.
#[derive(Debug)]
pub struct Stopping;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Stopping {
    pub fn new() -> Self {
        Self
    }

    pub fn step(
        &mut self,
        _params: &ProcParams,
        _ctx: &mut ProcCtx,
        _inputs: &mut ProcInputs,
        _cancelled: bool,
    ) -> StepOutput {
        StepOutput {
            action: StackAction::Pop,
            output: super::ProcOutput {
                cmds: vec![
                    EqptCmd::Drivetrain(DrivetrainCmd::Stop),
                    EqptCmd::Lift(LiftCmd::Stop),
                    EqptCmd::Skimmer(SkimmerCmd::Stop),
                ],
                ..Default::default()
            },
        }
    }
}
