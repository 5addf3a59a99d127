//! Drivetrain subsystem.
//!
//! Mixes the three drive axes into per-wheel duty cycles for the four
//! mecanum-style wheel modules. The motor controllers themselves are outside
//! the scope of this software; the mixed duties are what would be sent to
//! them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::DrivetrainCmd;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of wheel modules: front left, front right, back left, back right.
pub const NUM_WHEELS: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Drivetrain {
    /// Current per-wheel duty cycles.
    wheel_duty: [f64; NUM_WHEELS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Drivetrain {
    /// Execute a drivetrain command.
    pub fn exec(&mut self, cmd: &DrivetrainCmd) {
        match cmd {
            DrivetrainCmd::Drive {
                forward,
                horizontal,
                turn,
            } => self.mix(*forward, *horizontal, *turn),
            DrivetrainCmd::Stop => self.wheel_duty = [0.0; NUM_WHEELS],
        }
    }

    pub fn wheel_duty(&self) -> [f64; NUM_WHEELS] {
        self.wheel_duty
    }

    /// Mix the axis powers into per-wheel duties, normalising so that no
    /// wheel exceeds full duty.
    fn mix(&mut self, forward: f64, horizontal: f64, turn: f64) {
        let mut duty = [
            forward + horizontal + turn,
            forward - horizontal - turn,
            forward - horizontal + turn,
            forward + horizontal - turn,
        ];

        let largest = duty.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));
        if largest > 1.0 {
            for d in duty.iter_mut() {
                *d /= largest;
            }
        }

        self.wheel_duty = duty;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pure_forward() {
        let mut dt = Drivetrain::default();
        dt.exec(&DrivetrainCmd::Drive {
            forward: 0.5,
            horizontal: 0.0,
            turn: 0.0,
        });

        for duty in dt.wheel_duty().iter() {
            assert!((duty - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalisation() {
        let mut dt = Drivetrain::default();
        dt.exec(&DrivetrainCmd::Drive {
            forward: 1.0,
            horizontal: 1.0,
            turn: 1.0,
        });

        let max = dt
            .wheel_duty()
            .iter()
            .fold(0.0f64, |acc, d| acc.max(d.abs()));
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_zeroes_wheels() {
        let mut dt = Drivetrain::default();
        dt.exec(&DrivetrainCmd::Drive {
            forward: 0.5,
            horizontal: 0.2,
            turn: -0.1,
        });
        dt.exec(&DrivetrainCmd::Stop);

        assert_eq!(dt.wheel_duty(), [0.0; NUM_WHEELS]);
    }
}
