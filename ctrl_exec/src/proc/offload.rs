//! # [`Offload`] procedure state
//!
//! Offloading raises the skimmer to the dumping height over the berm and runs
//! the belt until the hopper is judged empty. That judgement currently comes
//! from a fixed timer wrapped in [`DumpMonitor`]; the monitor presents the
//! same start/complete interface as a goal tracker, so a load-sensing signal
//! can replace the timer without touching the sequence itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{EqptCmd, LiftCmd, SkimmerCmd};
use log::info;

use super::{
    params::{OffloadParams, ProcParams},
    ProcCtx, ProcInputs, ProcOutput, ProcTermination, StackAction, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Offload {
    step: OffloadStep,
    monitor: DumpMonitor,
}

/// Decides when the dump is finished.
///
/// Currently a fixed duration of session time. Swap point for a load-sensing
/// feedback signal.
#[derive(Debug, Default)]
pub struct DumpMonitor {
    started_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum OffloadStep {
    /// Command the skimmer up to the dumping height.
    Raise,

    /// Wait for the dumping height to be reached.
    WaitRaise,

    /// Start the belt.
    StartBelt,

    /// Run the belt until the dump monitor reports completion.
    Dump,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Offload {
    pub fn new() -> Self {
        Self {
            step: OffloadStep::Raise,
            monitor: DumpMonitor::default(),
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
            OffloadStep::Raise => {
                self.step = OffloadStep::WaitRaise;
                StepOutput::cmds(vec![EqptCmd::Lift(LiftCmd::SetHeight {
                    height_m: params.offload.dump_height_m,
                })])
            }
            OffloadStep::WaitRaise => {
                if inputs.goal_reached {
                    self.step = OffloadStep::StartBelt;
                }
                StepOutput::none()
            }
            OffloadStep::StartBelt => {
                self.step = OffloadStep::Dump;
                self.monitor.start(inputs.time_s);
                StepOutput::cmds(vec![EqptCmd::Skimmer(SkimmerCmd::SetPower {
                    power: params.offload.belt_power,
                })])
            }
            OffloadStep::Dump => {
                if self.monitor.complete(inputs.time_s, &params.offload) {
                    info!("Dump complete, stopping belt");
                    StepOutput {
                        action: StackAction::Pop,
                        output: ProcOutput {
                            cmds: vec![EqptCmd::Skimmer(SkimmerCmd::Stop)],
                            ..Default::default()
                        },
                    }
                } else {
                    StepOutput::none()
                }
            }
        }
    }
}

impl DumpMonitor {
    /// Record the start of the dump.
    pub fn start(&mut self, time_s: f64) {
        self.started_s = Some(time_s);
    }

    /// True once the dump should be stopped.
    pub fn complete(&self, time_s: f64, params: &OffloadParams) -> bool {
        match self.started_s {
            Some(t) => time_s - t >= params.dump_duration_s,
            None => false,
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
    use comms_if::eqpt::{EqptCmd, SkimmerCmd};

    /// Dump duration 8 s at power 0.3: the belt command carries 0.3 and the
    /// first belt stop is issued no earlier than 8 s of simulated time after
    /// the belt started.
    #[test]
    fn test_offload_belt_timing() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;
        rig.mgr.start(ProcKind::Offload, &ctx).unwrap();

        let (kind, term) = loop {
            if rig.lift_goal_m.is_some() && !rig.inputs.goal_reached {
                rig.inputs.goal_reached = true;
            }

            rig.step();
            if let Some(t) = rig.mgr.take_termination() {
                break t;
            }
        };

        assert_eq!(kind, ProcKind::Offload);
        assert_eq!(term, ProcTermination::Completed);

        // Belt started exactly once, at the configured power
        let starts: Vec<(f64, f64)> = rig
            .cmd_log
            .iter()
            .filter_map(|(t, c)| match c {
                EqptCmd::Skimmer(SkimmerCmd::SetPower { power }) => Some((*t, *power)),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].1, 0.3);

        // First belt stop no earlier than the dump duration after the start
        let first_stop_t = rig
            .cmd_log
            .iter()
            .find_map(|(t, c)| match c {
                EqptCmd::Skimmer(SkimmerCmd::Stop) => Some(*t),
                _ => None,
            })
            .unwrap();
        assert!(first_stop_t - starts[0].0 >= 8.0);

        // No belt command between the start and that stop
        assert_eq!(
            rig.cmd_log
                .iter()
                .filter(|(t, c)| {
                    *t > starts[0].0
                        && *t < first_stop_t
                        && matches!(c, EqptCmd::Skimmer(_))
                })
                .count(),
            0
        );
    }
}
