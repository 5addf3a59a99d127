//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::DrivetrainCmd;
use serde::Serialize;

// Internal
use super::{DriveCtrlError, Params, NUM_DRIVE_AXES};
use util::{maths, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// Ramp state for the forward, horizontal and turn axes.
    pub(crate) axes: [AxisRamp; NUM_DRIVE_AXES],
}

/// Slew-limiter state for a single axis.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxisRamp {
    /// The current (shaped) output value.
    current: f64,

    /// Session time of the last update, `None` before the first input event.
    last_update_s: Option<f64>,
}

/// Input data to drive control, one instance per joystick event.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// The raw axis values, each in `[-1, +1]`.
    pub axes: RawAxes,

    /// Session time of the event.
    pub time_s: f64,
}

/// Raw joystick axis values mapped to drive axes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawAxes {
    pub forward: f64,
    pub horizontal: f64,
    pub turn: f64,
}

/// Output command from DriveCtrl, published once per input event.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct OutputData {
    /// The combined drive command for the drivetrain endpoint.
    pub cmd: DrivetrainCmd,
}

/// Status report for DriveCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True for each axis whose demand was limited by the slew rate this
    /// event.
    pub rate_limited: [bool; NUM_DRIVE_AXES],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DriveCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Process one joystick input event into a drive command.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        // Scale the raw axes to the configured power limits
        let targets = [
            input_data.axes.forward * self.params.max_drive_power,
            input_data.axes.horizontal * self.params.max_drive_power,
            input_data.axes.turn * self.params.max_turn_power,
        ];

        for target in targets.iter() {
            if !target.is_finite() {
                return Err(DriveCtrlError::NonFiniteAxis(*target));
            }
        }

        let mut shaped = [0.0; NUM_DRIVE_AXES];
        for i in 0..NUM_DRIVE_AXES {
            let (value, limited) = self.axes[i].ramp(targets[i], input_data.time_s, &self.params);
            shaped[i] = value;
            self.report.rate_limited[i] = limited;
        }

        let output = OutputData {
            cmd: DrivetrainCmd::Drive {
                forward: shaped[0],
                horizontal: shaped[1],
                turn: shaped[2],
            },
        };

        Ok((output, self.report))
    }
}

impl AxisRamp {
    /// Move the output towards `target`, limited to the configured rate of
    /// change over the elapsed time since the last update.
    ///
    /// Targets within the deadzone of the current output leave it unchanged.
    /// Returns the new output and whether the slew limit was hit.
    fn ramp(&mut self, target: f64, time_s: f64, params: &Params) -> (f64, bool) {
        let elapsed_s = match self.last_update_s {
            Some(t) => (time_s - t).max(0.0),
            None => 0.0,
        };
        self.last_update_s = Some(time_s);

        let delta = target - self.current;
        if delta.abs() < params.axis_deadzone {
            return (self.current, false);
        }

        let max_step = params.max_rate_per_s * elapsed_s;
        let step = maths::clamp(delta, -max_step, max_step);
        self.current += step;

        (self.current, step != delta)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EVENT_PERIOD_S: f64 = 0.1;

    fn shaper() -> DriveCtrl {
        DriveCtrl {
            params: Params {
                max_drive_power: 1.0,
                max_turn_power: 1.0,
                max_rate_per_s: 2.0,
                axis_deadzone: 0.01,
            },
            ..Default::default()
        }
    }

    /// Run a sequence of forward-axis events at the event period, returning
    /// the shaped forward outputs.
    fn run(shaper: &mut DriveCtrl, raws: &[f64]) -> Vec<f64> {
        let mut outputs = Vec::new();
        let mut time_s = 0.0;

        for raw in raws {
            let input = InputData {
                axes: RawAxes {
                    forward: *raw,
                    ..Default::default()
                },
                time_s,
            };
            let (out, _) = shaper.proc(&input).unwrap();
            match out.cmd {
                DrivetrainCmd::Drive { forward, .. } => outputs.push(forward),
                _ => unreachable!(),
            }
            time_s += EVENT_PERIOD_S;
        }

        outputs
    }

    #[test]
    fn test_deadzone_leaves_output_unchanged() {
        let mut s = shaper();

        // Settle at zero, then apply a target within the deadzone
        let outputs = run(&mut s, &[0.0, 0.005, 0.009, -0.005]);
        for out in outputs {
            assert_eq!(out, 0.0);
        }
    }

    #[test]
    fn test_slew_rate_bound_holds() {
        let mut s = shaper();
        let max_step = 2.0 * EVENT_PERIOD_S;

        let outputs = run(&mut s, &[0.0, 1.0, 1.0, -1.0, -1.0, 1.0, 0.3, -0.7]);

        let mut prev = 0.0;
        for out in outputs {
            assert!(
                (out - prev).abs() <= max_step + 1e-12,
                "slew bound violated: {} -> {}",
                prev,
                out
            );
            prev = out;
        }
    }

    #[test]
    fn test_converges_within_expected_steps() {
        let mut s = shaper();
        let max_step = 2.0 * EVENT_PERIOD_S;

        // First event initialises the ramp timebase, then hold the target
        let steps_needed = (1.0f64 / max_step).ceil() as usize;
        let raws = vec![1.0; steps_needed + 1];
        let outputs = run(&mut s, &raws);

        assert_eq!(*outputs.last().unwrap(), 1.0);

        // And it did not converge early
        assert!(outputs[steps_needed - 1] < 1.0);
    }

    #[test]
    fn test_rate_limited_flag() {
        let mut s = shaper();

        // Large step demanded: limited on the second event, not once settled
        let input = |raw, t| InputData {
            axes: RawAxes {
                forward: raw,
                ..Default::default()
            },
            time_s: t,
        };

        s.proc(&input(0.0, 0.0)).unwrap();
        let (_, report) = s.proc(&input(1.0, 0.1)).unwrap();
        assert!(report.rate_limited[0]);

        // Step close enough to take in one go
        let mut s = shaper();
        s.proc(&input(0.0, 0.0)).unwrap();
        let (_, report) = s.proc(&input(0.1, 0.1)).unwrap();
        assert!(!report.rate_limited[0]);
    }

    #[test]
    fn test_non_finite_axis_rejected() {
        let mut s = shaper();
        let input = InputData {
            axes: RawAxes {
                forward: f64::NAN,
                ..Default::default()
            },
            time_s: 0.0,
        };
        assert!(s.proc(&input).is_err());
    }
}
