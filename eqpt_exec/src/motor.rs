//! First-order motor model.
//!
//! Stands in for the CAN motor controllers, which are outside the scope of
//! this software. Supports the two command types the subsystems use: open
//! loop duty cycle, and closed loop position.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single simulated motor.
#[derive(Debug, Clone, Copy)]
pub struct MotorSim {
    /// Shaft rate at full duty, in degrees per second.
    full_rate_deg_s: f64,

    /// Commanded duty cycle, used when no position target is set.
    duty: f64,

    /// Position target in degrees, `None` for duty cycle control.
    pos_target_deg: Option<f64>,

    /// Current shaft position in degrees.
    pos_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorSim {
    pub fn new(full_rate_deg_s: f64) -> Self {
        Self {
            full_rate_deg_s,
            duty: 0.0,
            pos_target_deg: None,
            pos_deg: 0.0,
        }
    }

    /// Command an open loop duty cycle, dropping any position target.
    pub fn set_duty(&mut self, duty: f64) {
        self.duty = maths::clamp(duty, -1.0, 1.0);
        self.pos_target_deg = None;
    }

    /// Command a closed loop position.
    pub fn set_pos_target_deg(&mut self, target_deg: f64) {
        self.pos_target_deg = Some(target_deg);
    }

    /// Zero power, dropping any position target.
    pub fn stop(&mut self) {
        self.duty = 0.0;
        self.pos_target_deg = None;
    }

    /// Advance the model by the given timestep.
    pub fn update(&mut self, dt_s: f64) {
        match self.pos_target_deg {
            Some(target) => {
                let max_step = self.full_rate_deg_s * dt_s;
                let delta = target - self.pos_deg;
                self.pos_deg += maths::clamp(delta, -max_step, max_step);
            }
            None => {
                self.pos_deg += self.duty * self.full_rate_deg_s * dt_s;
            }
        }
    }

    pub fn pos_deg(&self) -> f64 {
        self.pos_deg
    }

    pub fn duty(&self) -> f64 {
        self.duty
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_position_move_converges() {
        let mut motor = MotorSim::new(360.0);
        motor.set_pos_target_deg(90.0);

        for _ in 0..10 {
            motor.update(0.1);
        }

        assert!((motor.pos_deg() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_duty_integrates() {
        let mut motor = MotorSim::new(360.0);
        motor.set_duty(0.5);

        motor.update(1.0);
        assert!((motor.pos_deg() - 180.0).abs() < 1e-9);

        motor.stop();
        motor.update(1.0);
        assert!((motor.pos_deg() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_duty_clamped() {
        let mut motor = MotorSim::new(100.0);
        motor.set_duty(2.0);
        assert_eq!(motor.duty(), 1.0);
    }
}
