//! # [`Calibrate`] procedure state
//!
//! Field calibration establishes the odometry origin from the field markers.
//! The robot rotates slowly on the spot while the vision service is asked at a
//! fixed interval to detect the markers and reset odometry. Once a detection
//! succeeds the rotation is stopped and a fixed spin correction is performed
//! through the navigation service, leaving the robot aligned with the field
//! frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{DrivetrainCmd, EqptCmd},
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
pub struct Calibrate {
    step: CalibrateStep,

    /// Session time at which the next detect request is due.
    next_detect_time_s: Option<f64>,

    /// True while a detect request is outstanding with the vision service.
    detect_outstanding: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum CalibrateStep {
    /// Command the search rotation.
    StartRotate,

    /// Poll the vision service until the markers are found.
    Detect,

    /// Wait for the spin correction to complete.
    WaitSpin,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Calibrate {
    pub fn new() -> Self {
        Self {
            step: CalibrateStep::StartRotate,
            next_detect_time_s: None,
            detect_outstanding: false,
        }
    }

    pub fn step(
        &mut self,
        params: &ProcParams,
        ctx: &mut ProcCtx,
        inputs: &mut ProcInputs,
        cancelled: bool,
    ) -> StepOutput {
        if cancelled {
            return StepOutput::abort(ProcTermination::Cancelled);
        }

        match self.step {
            CalibrateStep::StartRotate => {
                self.next_detect_time_s = Some(inputs.time_s + params.calibrate.detect_interval_s);
                self.step = CalibrateStep::Detect;

                StepOutput::cmds(vec![EqptCmd::Drivetrain(DrivetrainCmd::Drive {
                    forward: 0.0,
                    horizontal: 0.0,
                    turn: params.calibrate.turn_power,
                })])
            }
            CalibrateStep::Detect => {
                // Resolve an outstanding request first
                if self.detect_outstanding {
                    match inputs.detect_result.take() {
                        Some(true) => {
                            info!("Field markers detected, odometry reset");
                            ctx.calibrated = true;
                            self.step = CalibrateStep::WaitSpin;

                            return StepOutput {
                                action: StackAction::None,
                                output: ProcOutput {
                                    cmds: vec![EqptCmd::Drivetrain(DrivetrainCmd::Stop)],
                                    nav_goal: Some(NavGoal::Spin {
                                        angle_rad: params.calibrate.correction_angle_rad,
                                    }),
                                    ..Default::default()
                                },
                            };
                        }
                        Some(false) => {
                            self.detect_outstanding = false;
                            self.next_detect_time_s =
                                Some(inputs.time_s + params.calibrate.detect_interval_s);
                        }
                        None => (),
                    }

                    return StepOutput::none();
                }

                // Fire the next request when its interval has elapsed
                if inputs.time_s >= self.next_detect_time_s.unwrap_or(0.0) {
                    self.detect_outstanding = true;
                    return StepOutput {
                        action: StackAction::None,
                        output: ProcOutput {
                            detect_request: true,
                            ..Default::default()
                        },
                    };
                }

                StepOutput::none()
            }
            CalibrateStep::WaitSpin => match inputs.nav_result.take() {
                Some(NavOutcome::Succeeded) => {
                    info!("Spin correction complete, field calibration finished");
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
    use comms_if::{
        eqpt::{DrivetrainCmd, EqptCmd},
        nav::{NavGoal, NavOutcome},
    };

    /// Vision mock succeeds on the 3rd poll: the drivetrain must receive
    /// exactly one rotate command followed by one stop, and exactly one spin
    /// correction must be issued.
    #[test]
    fn test_calibrate_success_on_third_poll() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Calibrate, &ctx).unwrap();

        let mut polls_answered = 0;
        for _ in 0..200 {
            // Answer each detect request on the following cycle, succeeding
            // on the third
            if rig.detect_requests > polls_answered {
                polls_answered += 1;
                rig.inputs.detect_result = Some(polls_answered == 3);
            }

            // Complete the spin correction as soon as it is started
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Succeeded);
            }

            rig.step();
            if rig.mgr.take_termination().is_some() {
                break;
            }
        }

        assert!(rig.ctx.calibrated);
        assert_eq!(polls_answered, 3);
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Drive { .. }))),
            1
        );
        // One stop on detection plus one from the cleanup state
        assert_eq!(
            rig.count_cmds(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Stop))),
            2
        );
        assert_eq!(
            rig.nav_goals
                .iter()
                .filter(|g| matches!(g, NavGoal::Spin { .. }))
                .count(),
            1
        );

        // The rotate command came before the stop
        let rotate_idx = rig
            .cmds
            .iter()
            .position(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Drive { .. })))
            .unwrap();
        let stop_idx = rig
            .cmds
            .iter()
            .position(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Stop)))
            .unwrap();
        assert!(rotate_idx < stop_idx);
    }

    /// A failed spin correction aborts the procedure with NavigationFailed.
    #[test]
    fn test_calibrate_spin_failure_aborts() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Calibrate, &ctx).unwrap();

        let mut answered = false;
        let term = loop {
            if rig.detect_requests > 0 && !answered {
                answered = true;
                rig.inputs.detect_result = Some(true);
            }
            if rig.inputs.nav_pending {
                rig.finish_nav(NavOutcome::Failed);
            }

            rig.step();
            if let Some((_, term)) = rig.mgr.take_termination() {
                break term;
            }
        };

        assert_eq!(term, ProcTermination::NavigationFailed);
    }
}
