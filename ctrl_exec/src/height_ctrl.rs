//! # Height goal tracker
//!
//! Translates the lift subsystem's periodic height samples into a boolean
//! goal-reached signal. Procedures poll the flag rather than being signalled
//! directly, tolerating at most one sample period of staleness.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Tracks progress of the lift towards its commanded height goal.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct HeightTracker {
    /// Goal height reached when the measured height is within this threshold.
    threshold_m: f64,

    /// The commanded goal height, `None` before the first goal is set.
    goal_m: Option<f64>,

    /// The latest measured height, `None` before the first sample.
    measured_m: Option<f64>,

    /// True when the latest sample was within the threshold of the goal.
    reached: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HeightTracker {
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            ..Default::default()
        }
    }

    /// Set the goal threshold. Used at init, after the parameters are loaded.
    pub fn set_threshold(&mut self, threshold_m: f64) {
        self.threshold_m = threshold_m;
    }

    /// Store a new commanded goal, clearing the reached flag until a sample
    /// confirms it.
    pub fn set_goal(&mut self, goal_m: f64) {
        self.goal_m = Some(goal_m);
        self.reached = false;
    }

    /// Process a new height sample, recomputing the reached flag.
    pub fn on_sample(&mut self, measured_m: f64) {
        self.measured_m = Some(measured_m);

        if let Some(goal_m) = self.goal_m {
            self.reached = (goal_m - measured_m).abs() <= self.threshold_m;
        }
    }

    /// True when the latest sample was within the threshold of the goal.
    pub fn reached(&self) -> bool {
        self.reached
    }

    pub fn goal_m(&self) -> Option<f64> {
        self.goal_m
    }

    pub fn measured_m(&self) -> Option<f64> {
        self.measured_m
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reached_iff_within_threshold() {
        let mut tracker = HeightTracker::new(0.02);

        tracker.set_goal(0.5);
        assert!(!tracker.reached());

        tracker.on_sample(0.4);
        assert!(!tracker.reached());

        tracker.on_sample(0.49);
        assert!(tracker.reached());

        tracker.on_sample(0.52);
        assert!(tracker.reached());

        tracker.on_sample(0.53);
        assert!(!tracker.reached());
    }

    #[test]
    fn test_goal_change_clears_reached() {
        let mut tracker = HeightTracker::new(0.02);

        tracker.set_goal(0.5);
        tracker.on_sample(0.5);
        assert!(tracker.reached());

        // Changing the goal while reached immediately clears the flag
        tracker.set_goal(0.1);
        assert!(!tracker.reached());

        // And the next sample recomputes it against the new goal
        tracker.on_sample(0.1);
        assert!(tracker.reached());
    }

    #[test]
    fn test_no_goal_never_reached() {
        let mut tracker = HeightTracker::new(0.02);

        tracker.on_sample(0.0);
        assert!(!tracker.reached());
    }
}
