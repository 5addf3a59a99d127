//! Lift (skimmer height adjust) subsystem.
//!
//! Heights are commanded in meters and converted to motor shaft angles
//! through the pulley geometry. The measured height is derived back from the
//! shaft position and published to the control executable at the sample rate.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::LiftCmd;
use serde::Deserialize;

use crate::motor::MotorSim;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Lift {
    params: LiftParams,
    motor: MotorSim,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LiftParams {
    /// Circumference of the height adjust pulley.
    pub pulley_circumference_m: f64,

    /// Gear ratio between the motor and the pulley.
    pub gear_ratio: f64,

    /// Motor shaft rate at full duty, in degrees per second.
    pub motor_full_rate_deg_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Lift {
    pub fn new(params: LiftParams) -> Self {
        Self {
            params,
            motor: MotorSim::new(params.motor_full_rate_deg_s),
        }
    }

    /// Execute a lift command.
    pub fn exec(&mut self, cmd: &LiftCmd) {
        match cmd {
            LiftCmd::SetHeight { height_m } => {
                let target_deg = self.height_to_deg(*height_m);
                self.motor.set_pos_target_deg(target_deg);
            }
            LiftCmd::SetPower { power } => self.motor.set_duty(*power),
            LiftCmd::Stop => self.motor.stop(),
        }
    }

    /// Advance the actuator model.
    pub fn update(&mut self, dt_s: f64) {
        self.motor.update(dt_s);
    }

    /// The current measured height.
    pub fn height_m(&self) -> f64 {
        self.deg_to_height(self.motor.pos_deg())
    }

    fn height_to_deg(&self, height_m: f64) -> f64 {
        self.params.gear_ratio * (height_m / self.params.pulley_circumference_m) * 360.0
    }

    fn deg_to_height(&self, deg: f64) -> f64 {
        (deg * self.params.pulley_circumference_m) / (360.0 * self.params.gear_ratio)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn lift() -> Lift {
        Lift::new(LiftParams {
            pulley_circumference_m: 0.1,
            gear_ratio: 1.0,
            motor_full_rate_deg_s: 720.0,
        })
    }

    #[test]
    fn test_height_angle_conversion() {
        let lift = lift();

        // One pulley turn lifts by one circumference
        assert!((lift.height_to_deg(0.1) - 360.0).abs() < 1e-9);
        assert!((lift.deg_to_height(360.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_set_height_converges() {
        let mut lift = lift();

        lift.exec(&LiftCmd::SetHeight { height_m: 0.25 });
        for _ in 0..20 {
            lift.update(0.1);
        }

        assert!((lift.height_m() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_stop_holds_position() {
        let mut lift = lift();

        lift.exec(&LiftCmd::SetPower { power: 0.5 });
        lift.update(0.5);
        let height = lift.height_m();
        assert!(height > 0.0);

        lift.exec(&LiftCmd::Stop);
        lift.update(0.5);
        assert_eq!(lift.height_m(), height);
    }
}
