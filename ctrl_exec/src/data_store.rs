//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{eqpt::DrivetrainCmd, nav::NavOutcome};

use crate::{
    drive_ctrl::{DriveCtrl, StatusReport},
    height_ctrl::HeightTracker,
    joy::JoyProcessor,
    mode_mgr::ModeMgr,
    nav_client::NavTaskHandle,
    proc::{ProcCtx, ProcMgr},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // Mode arbitration
    pub mode_mgr: ModeMgr,

    // Procedures
    pub proc_mgr: ProcMgr,
    pub proc_ctx: ProcCtx,

    // Joystick input
    pub joy_proc: JoyProcessor,

    // Drive control
    pub drive_ctrl: DriveCtrl,
    pub drive_ctrl_report: StatusReport,
    pub last_drive_cmd: Option<DrivetrainCmd>,

    // Lift feedback
    pub height_tracker: HeightTracker,

    // Navigation task tracking
    pub nav_task: Option<NavTaskHandle>,
    pub nav_result: Option<NavOutcome>,

    // Vision
    pub detect_result: Option<bool>,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the 1Hz cycle flag and clears those items that must not persist
    /// between cycles.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.drive_ctrl_report = StatusReport::default();
    }
}
