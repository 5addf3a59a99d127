//! # Mode manager
//!
//! Top-level arbiter deciding whether the joystick or the autonomous
//! procedure manager is in command of the actuators. Exactly one mode is
//! active at a time; the robot boots in teleop and always returns to teleop
//! when a procedure terminates, whatever the reason.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use crate::proc::{ProcCtx, ProcKind, ProcMgr, ProcStartError, ProcTermination};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The operating mode of the robot.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum Mode {
    /// The joystick commands the actuators.
    Teleop,

    /// A procedure commands the actuators.
    Autonomous,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mode state machine.
pub struct ModeMgr {
    mode: Mode,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ModeMgr {
    fn default() -> Self {
        Self { mode: Mode::Teleop }
    }
}

impl ModeMgr {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Start the given procedure and enter autonomous mode.
    ///
    /// Valid only from teleop; the start error is returned to the caller (an
    /// input handler), which logs it and carries on. The mode only changes
    /// when the procedure actually started, so a rejected request cannot
    /// leave the state machine inconsistent.
    pub fn request_autonomous(
        &mut self,
        kind: ProcKind,
        proc_mgr: &mut ProcMgr,
        ctx: &ProcCtx,
    ) -> Result<(), ProcStartError> {
        if self.mode == Mode::Autonomous {
            return Err(ProcStartError::AlreadyRunning(kind));
        }

        proc_mgr.start(kind, ctx)?;
        self.mode = Mode::Autonomous;
        info!("Mode change to {:?}", self.mode);

        Ok(())
    }

    /// Request cancellation of the running procedure.
    ///
    /// Valid only from autonomous mode. The transition back to teleop is
    /// event-driven: it happens in [`ModeMgr::on_procedure_finished`] once the
    /// procedure's cleanup has executed, so there is no window in which two
    /// authorities command the actuators.
    pub fn request_cancel(&mut self, proc_mgr: &mut ProcMgr) {
        if self.mode != Mode::Autonomous {
            warn!("Cancel requested in teleop mode, ignored");
            return;
        }

        proc_mgr.cancel();
    }

    /// Handle a procedure termination reported by the procedure manager.
    pub fn on_procedure_finished(&mut self, kind: ProcKind, term: ProcTermination) {
        match term {
            ProcTermination::Completed => info!("Procedure {} completed", kind),
            _ => warn!("Procedure {} terminated: {}", kind, term),
        }

        self.mode = Mode::Teleop;
        info!("Mode change to {:?}", self.mode);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::proc::test_util::TestRig;

    #[test]
    fn test_mode_transitions() {
        let mut rig = TestRig::new();
        let mut mode_mgr = ModeMgr::default();
        let ctx = rig.ctx;

        assert_eq!(mode_mgr.mode(), Mode::Teleop);

        mode_mgr
            .request_autonomous(ProcKind::Dig, &mut rig.mgr, &ctx)
            .unwrap();
        assert_eq!(mode_mgr.mode(), Mode::Autonomous);

        // A second request is rejected and does not change the mode
        assert!(mode_mgr
            .request_autonomous(ProcKind::Offload, &mut rig.mgr, &ctx)
            .is_err());
        assert_eq!(mode_mgr.mode(), Mode::Autonomous);

        // Cancel, run cleanup, and confirm the event-driven return to teleop
        mode_mgr.request_cancel(&mut rig.mgr);
        assert_eq!(mode_mgr.mode(), Mode::Autonomous);

        let (kind, term) = rig.run_to_termination(10);
        mode_mgr.on_procedure_finished(kind, term);
        assert_eq!(mode_mgr.mode(), Mode::Teleop);
        assert_eq!(term, ProcTermination::Cancelled);
    }

    #[test]
    fn test_failed_start_stays_teleop() {
        let mut rig = TestRig::new();
        let mut mode_mgr = ModeMgr::default();
        let ctx = rig.ctx;

        // Cycle without calibration is rejected synchronously
        assert!(mode_mgr
            .request_autonomous(ProcKind::Cycle, &mut rig.mgr, &ctx)
            .is_err());
        assert_eq!(mode_mgr.mode(), Mode::Teleop);
        assert!(!rig.mgr.is_active());
    }
}
