//! # [`Cycle`] procedure state
//!
//! A full excavation cycle: navigate to the dig site, dig, navigate to the
//! berm, offload. The dig and offload phases reuse the [`Dig`] and
//! [`Offload`] states by pushing them above this one on the procedure stack;
//! control returns here when they pop themselves off.
//!
//! The cycle requires field calibration to have succeeded already. This is
//! enforced by the manager before the state is ever pushed, so a cycle
//! request on an uncalibrated robot issues no commands at all.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::nav::{NavGoal, NavOutcome};
use log::info;

use super::{
    params::ProcParams,
    states::{Dig, Offload},
    ProcCtx, ProcInputs, ProcOutput, ProcState, ProcTermination, StackAction, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Cycle {
    step: CycleStep,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum CycleStep {
    /// Start navigation to the dig site.
    NavToDigSite,

    /// Wait for the dig site to be reached.
    WaitNavDigSite,

    /// Push the dig state.
    RunDig,

    /// Start navigation to the berm.
    NavToBerm,

    /// Wait for the berm to be reached.
    WaitNavBerm,

    /// Push the offload state.
    RunOffload,

    /// The offload has popped, the cycle is complete.
    Done,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Cycle {
    pub fn new() -> Self {
        Self {
            step: CycleStep::NavToDigSite,
        }
    }

    pub fn step(
        &mut self,
        _params: &ProcParams,
        ctx: &mut ProcCtx,
        inputs: &mut ProcInputs,
        cancelled: bool,
    ) -> StepOutput {
        if cancelled {
            return StepOutput::abort(ProcTermination::Cancelled);
        }

        match self.step {
            CycleStep::NavToDigSite => {
                self.step = CycleStep::WaitNavDigSite;
                StepOutput {
                    action: StackAction::None,
                    output: ProcOutput {
                        nav_goal: Some(NavGoal::GoToPose(ctx.dig_site)),
                        ..Default::default()
                    },
                }
            }
            CycleStep::WaitNavDigSite => match inputs.nav_result.take() {
                Some(NavOutcome::Succeeded) => {
                    self.step = CycleStep::RunDig;
                    StepOutput::none()
                }
                Some(NavOutcome::Failed) => StepOutput::abort(ProcTermination::NavigationFailed),
                None => StepOutput::none(),
            },
            CycleStep::RunDig => {
                info!("Dig site reached, starting dig");
                self.step = CycleStep::NavToBerm;
                StepOutput {
                    action: StackAction::PushAbove(ProcState::Dig(Dig::new())),
                    output: ProcOutput::default(),
                }
            }
            CycleStep::NavToBerm => {
                self.step = CycleStep::WaitNavBerm;
                StepOutput {
                    action: StackAction::None,
                    output: ProcOutput {
                        nav_goal: Some(NavGoal::GoToPose(ctx.berm_site)),
                        ..Default::default()
                    },
                }
            }
            CycleStep::WaitNavBerm => match inputs.nav_result.take() {
                Some(NavOutcome::Succeeded) => {
                    self.step = CycleStep::RunOffload;
                    StepOutput::none()
                }
                Some(NavOutcome::Failed) => StepOutput::abort(ProcTermination::NavigationFailed),
                None => StepOutput::none(),
            },
            CycleStep::RunOffload => {
                info!("Berm reached, starting offload");
                self.step = CycleStep::Done;
                StepOutput {
                    action: StackAction::PushAbove(ProcState::Offload(Offload::new())),
                    output: ProcOutput::default(),
                }
            }
            CycleStep::Done => StepOutput {
                action: StackAction::Pop,
                output: ProcOutput::default(),
            },
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
        eqpt::{EqptCmd, SkimmerCmd},
        nav::{NavGoal, NavOutcome},
    };

    #[test]
    fn test_cycle_full_run() {
        let mut rig = TestRig::new();
        rig.ctx.calibrated = true;
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Cycle, &ctx).unwrap();

        let (kind, term) = loop {
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

        assert_eq!(kind, ProcKind::Cycle);
        assert_eq!(term, ProcTermination::Completed);

        // Two go-to-pose legs plus the dig's drive-on-heading
        let gotos = rig
            .nav_goals
            .iter()
            .filter(|g| matches!(g, NavGoal::GoToPose(_)))
            .count();
        let drives = rig
            .nav_goals
            .iter()
            .filter(|g| matches!(g, NavGoal::DriveOnHeading { .. }))
            .count();
        assert_eq!(gotos, 2);
        assert_eq!(drives, 1);

        // The belt ran twice: once cutting, once dumping
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::SetPower { .. }))),
            2
        );
    }

    #[test]
    fn test_cycle_aborts_on_failed_leg() {
        let mut rig = TestRig::new();
        rig.ctx.calibrated = true;
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Cycle, &ctx).unwrap();

        let (_, term) = loop {
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Failed);
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(term, ProcTermination::NavigationFailed);

        // The dig never started: no belt commands were issued
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::SetPower { .. }))),
            0
        );
    }
}
