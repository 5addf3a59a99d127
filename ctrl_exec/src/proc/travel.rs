//! # [`Travel`] procedure state
//!
//! Travel takes the robot to one of the named field sites. Navigation needs a
//! valid odometry origin, so an uncalibrated robot calibrates first by
//! pushing the [`Calibrate`] state; a robot that has already calibrated this
//! session goes straight to the navigation leg.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::nav::{NavGoal, NavOutcome, Pose2};
use log::info;
use serde::Serialize;

use super::{
    params::ProcParams, states::Calibrate, ProcCtx, ProcInputs, ProcOutput, ProcState,
    ProcTermination, StackAction, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Travel {
    site: TravelSite,
    step: TravelStep,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The named sites the robot can travel to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum TravelSite {
    DigSite,
    Berm,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum TravelStep {
    /// Calibrate first if the field origin is not yet known.
    EnsureCalibrated,

    /// Start navigation to the site.
    NavToSite,

    /// Wait for the site to be reached.
    WaitNav,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Travel {
    pub fn new(site: TravelSite) -> Self {
        Self {
            site,
            step: TravelStep::EnsureCalibrated,
        }
    }

    fn site_pose(&self, ctx: &ProcCtx) -> Pose2 {
        match self.site {
            TravelSite::DigSite => ctx.dig_site,
            TravelSite::Berm => ctx.berm_site,
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
            TravelStep::EnsureCalibrated => {
                self.step = TravelStep::NavToSite;

                if ctx.calibrated {
                    StepOutput::none()
                } else {
                    StepOutput {
                        action: StackAction::PushAbove(ProcState::Calibrate(Calibrate::new())),
                        output: ProcOutput::default(),
                    }
                }
            }
            TravelStep::NavToSite => {
                self.step = TravelStep::WaitNav;
                StepOutput {
                    action: StackAction::None,
                    output: ProcOutput {
                        nav_goal: Some(NavGoal::GoToPose(self.site_pose(ctx))),
                        ..Default::default()
                    },
                }
            }
            TravelStep::WaitNav => match inputs.nav_result.take() {
                Some(NavOutcome::Succeeded) => {
                    info!("Travel to {:?} complete", self.site);
                    StepOutput {
                        action: StackAction::Pop,
                        output: ProcOutput::default(),
                    }
                }
                Some(NavOutcome::Failed) => StepOutput::abort(ProcTermination::NavigationFailed),
                None => StepOutput::none(),
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
    use super::TravelSite;
    use comms_if::nav::{NavGoal, NavOutcome};

    #[test]
    fn test_travel_calibrates_first() {
        let mut rig = TestRig::new();
        assert!(!rig.ctx.calibrated);
        let ctx = rig.ctx;
        rig.mgr
            .start(ProcKind::Travel(TravelSite::Berm), &ctx)
            .unwrap();

        let mut answered = false;
        let (_, term) = loop {
            if rig.detect_requests > 0 && !answered {
                answered = true;
                rig.inputs.detect_result = Some(true);
            }
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Succeeded);
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(term, ProcTermination::Completed);
        assert!(rig.ctx.calibrated);

        // The calibration spin was followed by the travel leg
        assert!(matches!(rig.nav_goals[0], NavGoal::Spin { .. }));
        assert!(matches!(rig.nav_goals[1], NavGoal::GoToPose(_)));
    }

    #[test]
    fn test_travel_skips_calibration_when_done() {
        let mut rig = TestRig::new();
        rig.ctx.calibrated = true;
        let ctx = rig.ctx;
        rig.mgr
            .start(ProcKind::Travel(TravelSite::DigSite), &ctx)
            .unwrap();

        let (_, term) = loop {
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Succeeded);
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(term, ProcTermination::Completed);
        assert_eq!(rig.detect_requests, 0);
        assert_eq!(rig.nav_goals.len(), 1);
        assert!(matches!(rig.nav_goals[0], NavGoal::GoToPose(_)));
    }

    #[test]
    fn test_travel_reports_nav_failure() {
        let mut rig = TestRig::new();
        rig.ctx.calibrated = true;
        let ctx = rig.ctx;
        rig.mgr
            .start(ProcKind::Travel(TravelSite::DigSite), &ctx)
            .unwrap();

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
    }
}
