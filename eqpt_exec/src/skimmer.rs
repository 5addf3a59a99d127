//! Skimmer belt subsystem.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::SkimmerCmd;
use util::maths;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Skimmer {
    /// Current belt power.
    power: f64,

    /// True while the belt is running, used by the toggle command.
    running: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Skimmer {
    /// Execute a skimmer command.
    pub fn exec(&mut self, cmd: &SkimmerCmd) {
        match cmd {
            SkimmerCmd::SetPower { power } => self.set_power(*power),
            SkimmerCmd::Toggle { power } => {
                if self.running {
                    self.stop();
                } else {
                    self.set_power(*power);
                }
            }
            SkimmerCmd::Stop => self.stop(),
        }
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn running(&self) -> bool {
        self.running
    }

    fn set_power(&mut self, power: f64) {
        self.power = maths::clamp(power, -1.0, 1.0);
        self.running = self.power != 0.0;
    }

    fn stop(&mut self) {
        self.power = 0.0;
        self.running = false;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut skimmer = Skimmer::default();

        skimmer.exec(&SkimmerCmd::Toggle { power: 0.3 });
        assert!(skimmer.running());
        assert_eq!(skimmer.power(), 0.3);

        skimmer.exec(&SkimmerCmd::Toggle { power: 0.3 });
        assert!(!skimmer.running());
        assert_eq!(skimmer.power(), 0.0);
    }

    #[test]
    fn test_stop_idempotent() {
        let mut skimmer = Skimmer::default();

        skimmer.exec(&SkimmerCmd::SetPower { power: -0.3 });
        skimmer.exec(&SkimmerCmd::Stop);
        skimmer.exec(&SkimmerCmd::Stop);
        assert!(!skimmer.running());
        assert_eq!(skimmer.power(), 0.0);
    }
}
