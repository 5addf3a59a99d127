//! # [`Dig`] procedure state
//!
//! Digging lowers the skimmer onto the regolith, runs the belt while driving
//! forward over the excavation zone, then raises the skimmer to the transit
//! height with the excavated material on board.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{DrivetrainCmd, EqptCmd, LiftCmd, SkimmerCmd},
    nav::{NavGoal, NavOutcome},
};
use log::info;

use super::{
    params::ProcParams, ProcCtx, ProcInputs, ProcOutput, ProcTermination, StackAction, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Dig {
    step: DigStep,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum DigStep {
    /// Command the skimmer down to the digging height.
    Lower,

    /// Wait for the digging height to be reached.
    WaitLower,

    /// Start the belt and the cutting drive.
    Cut,

    /// Wait for the cutting drive to complete.
    WaitDrive,

    /// Stop the drivetrain and the belt.
    StopCut,

    /// Command the skimmer up to the transit height.
    Raise,

    /// Wait for the transit height to be reached.
    WaitRaise,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dig {
    pub fn new() -> Self {
        Self {
            step: DigStep::Lower,
        }
    }

    pub fn step(
        &mut self,
        params: &ProcParams,
        _ctx: &mut ProcCtx,
        inputs: &mut ProcInputs,
        cancelled: bool,
    ) -> StepOutput {
        if cancelled {
            return StepOutput::abort(ProcTermination::Cancelled);
        }

        match self.step {
            DigStep::Lower => {
                self.step = DigStep::WaitLower;
                StepOutput::cmds(vec![EqptCmd::Lift(LiftCmd::SetHeight {
                    height_m: params.dig.digging_height_m,
                })])
            }
            DigStep::WaitLower => {
                if inputs.goal_reached {
                    self.step = DigStep::Cut;
                }
                StepOutput::none()
            }
            DigStep::Cut => {
                self.step = DigStep::WaitDrive;
                StepOutput {
                    action: StackAction::None,
                    output: ProcOutput {
                        cmds: vec![EqptCmd::Skimmer(SkimmerCmd::SetPower {
                            power: params.dig.belt_power,
                        })],
                        nav_goal: Some(NavGoal::DriveOnHeading {
                            distance_m: params.dig.drive_distance_m,
                            speed_ms: params.dig.drive_speed_ms,
                        }),
                        ..Default::default()
                    },
                }
            }
            DigStep::WaitDrive => match inputs.nav_result.take() {
                Some(NavOutcome::Succeeded) => {
                    self.step = DigStep::StopCut;
                    StepOutput::none()
                }
                Some(NavOutcome::Failed) => StepOutput::abort(ProcTermination::NavigationFailed),
                None => StepOutput::none(),
            },
            DigStep::StopCut => {
                self.step = DigStep::Raise;
                StepOutput::cmds(vec![
                    EqptCmd::Drivetrain(DrivetrainCmd::Stop),
                    EqptCmd::Skimmer(SkimmerCmd::Stop),
                ])
            }
            DigStep::Raise => {
                self.step = DigStep::WaitRaise;
                StepOutput::cmds(vec![EqptCmd::Lift(LiftCmd::SetHeight {
                    height_m: params.dig.transit_height_m,
                })])
            }
            DigStep::WaitRaise => {
                if inputs.goal_reached {
                    info!("Dig complete, skimmer at transit height");
                    StepOutput {
                        action: StackAction::Pop,
                        output: ProcOutput::default(),
                    }
                } else {
                    StepOutput::none()
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::test_util::TestRig;
    use super::super::{ProcKind, ProcTermination};
    use comms_if::{
        eqpt::{DrivetrainCmd, EqptCmd, LiftCmd, SkimmerCmd},
        nav::{NavGoal, NavOutcome},
    };

    #[test]
    fn test_dig_nominal_sequence() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Dig, &ctx).unwrap();

        let (kind, term) = loop {
            // Reach any commanded lift height after a few cycles
            if rig.lift_goal_m.is_some() && !rig.inputs.goal_reached {
                rig.inputs.goal_reached = true;
            }
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Succeeded);
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(kind, ProcKind::Dig);
        assert_eq!(term, ProcTermination::Completed);

        // Lift commanded to digging height then transit height
        let heights: Vec<f64> = rig
            .cmds
            .iter()
            .filter_map(|c| match c {
                EqptCmd::Lift(LiftCmd::SetHeight { height_m }) => Some(*height_m),
                _ => None,
            })
            .collect();
        assert_eq!(heights.len(), 2);
        assert!(heights[0] < heights[1]);

        // One cutting drive was started
        assert_eq!(
            rig.nav_goals
                .iter()
                .filter(|g| matches!(g, NavGoal::DriveOnHeading { .. }))
                .count(),
            1
        );

        // The belt ran and was stopped before the cleanup stop
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::SetPower { .. }))),
            1
        );
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::Stop))),
            2
        );
    }

    #[test]
    fn test_dig_nav_failure_aborts() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Dig, &ctx).unwrap();

        let (_, term) = loop {
            if rig.lift_goal_m.is_some() && !rig.inputs.goal_reached {
                rig.inputs.goal_reached = true;
            }
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Failed);
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(term, ProcTermination::NavigationFailed);

        // The abort ran the safe stop: all three subsystems stopped
        assert!(rig.count_cmds(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Stop))) >= 1);
        assert!(rig.count_cmds(|c| matches!(c, EqptCmd::Lift(LiftCmd::Stop))) >= 1);
        assert!(rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::Stop))) >= 1);
    }
}
