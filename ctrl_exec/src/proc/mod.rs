//! # Procedure manager module
//!
//! This module implements the [`ProcMgr`] state machine, which supervises the
//! autonomous procedures of the robot. At most one procedure runs at a time;
//! the manager owns the running procedure's states and its cancellation flag,
//! and guarantees that a safe stop of all equipment is commanded on every exit
//! path.
//!
//! Procedures are broken down into stackable states:
//!
//! - `Stopping` - Zeroes power to all equipment, then pops itself.
//! - `Calibrate` - Rotates until the field markers are detected and odometry
//!   is reset, then performs a spin correction.
//! - `Dig` - Lowers the skimmer, cuts a trench while running the belt, then
//!   raises the skimmer to the transit height.
//! - `Offload` - Raises the skimmer to the dumping height and runs the belt
//!   for the configured dump duration.
//! - `Cycle` - Navigates to the dig site, digs, navigates to the berm and
//!   offloads.
//! - `Travel` - Calibrates if required and navigates to a named site.
//!
//! States are stackable so that compound procedures reuse the simple ones:
//! `Cycle` pushes `Dig` and `Offload` above itself at the right points. When a
//! root procedure is started a `Stopping` state is pushed below it, so that
//! popping off the end of a successful run always executes the safe stop. An
//! abort (cancellation or navigation failure) clears the stack and runs
//! `Stopping` in the same cycle, so cleanup can never be skipped or delayed.
//!
//! States never talk to the network directly. Each step returns the equipment
//! commands and service requests it wants issued, and the main loop routes
//! them, keeping a single attribution path for every actuation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod calibrate;
mod cycle;
mod dig;
mod offload;
mod params;
mod stopping;
mod travel;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::calibrate::Calibrate;
    pub use super::cycle::Cycle;
    pub use super::dig::Dig;
    pub use super::offload::{DumpMonitor, Offload};
    pub use super::stopping::Stopping;
    pub use super::travel::{Travel, TravelSite};
}

pub use self::params::{FieldParams, ProcParams, SitePose};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use comms_if::{
    eqpt::EqptCmd,
    nav::{NavGoal, NavOutcome, Pose2},
};
use log::{info, warn};
use serde::Serialize;
use states::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Procedure manager.
///
/// Owns the currently running procedure (at most one) and its cancellation
/// flag. The main loop calls [`ProcMgr::step`] once per cycle while a
/// procedure is active and routes the returned output to the equipment and
/// service clients.
#[derive(Default)]
pub struct ProcMgr {
    /// Parameters for all procedure states.
    params: ProcParams,

    /// The stack of procedure states.
    stack: ProcStack,

    /// The kind of the currently running root procedure.
    active: Option<ProcKind>,

    /// Cancellation flag for the running procedure.
    ///
    /// Set at most once per run by [`ProcMgr::cancel`], never cleared until
    /// the procedure has finished its cleanup. Observed by the active state at
    /// its next step, which is the tick-level equivalent of a coroutine
    /// suspension point.
    cancel_pending: bool,

    /// Termination reason recorded by an abort, reported once the stack has
    /// emptied.
    pending_termination: Option<ProcTermination>,

    /// Set when the procedure has terminated, consumed by
    /// [`ProcMgr::take_termination`].
    finished: Option<(ProcKind, ProcTermination)>,
}

/// Persistent context shared by all procedures.
///
/// This is data which remains valid across procedure runs, such as whether the
/// field coordinates have been calibrated since boot.
#[derive(Debug, Clone, Copy)]
pub struct ProcCtx {
    /// True once a `Calibrate` procedure has succeeded.
    pub calibrated: bool,

    /// Pose of the excavation zone entry point.
    pub dig_site: Pose2,

    /// Pose of the berm (deposit zone) entry point.
    pub berm_site: Pose2,
}

impl Default for ProcCtx {
    fn default() -> Self {
        Self {
            calibrated: false,
            dig_site: Pose2::new(0.0, 0.0, 0.0),
            berm_site: Pose2::new(0.0, 0.0, 0.0),
        }
    }
}

/// Per-cycle inputs to the procedure states.
///
/// The consumable fields (`nav_result`, `detect_result`) are `take()`n by the
/// state that was waiting on them.
#[derive(Debug, Default)]
pub struct ProcInputs {
    /// Session time at the start of this cycle.
    pub time_s: f64,

    /// Latest lift height-goal-reached flag from the goal tracker.
    pub goal_reached: bool,

    /// True while a navigation task is in flight.
    pub nav_pending: bool,

    /// Outcome of the navigation task that completed this cycle, if any.
    pub nav_result: Option<NavOutcome>,

    /// Result of the field-detect request that completed this cycle, if any.
    pub detect_result: Option<bool>,
}

/// Output of a single manager step, routed by the main loop.
#[derive(Debug, Default)]
pub struct ProcOutput {
    /// Equipment commands to dispatch, in order.
    pub cmds: Vec<EqptCmd>,

    /// Navigation goal to start.
    pub nav_goal: Option<NavGoal>,

    /// True if a field-detect request should be issued.
    pub detect_request: bool,
}

/// Output of a state's step function.
#[derive(Debug)]
pub struct StepOutput {
    /// Action to perform on the stack itself.
    pub action: StackAction,

    /// Data to be routed out of the manager.
    pub output: ProcOutput,
}

/// State stacking abstraction.
#[derive(Debug, Default)]
pub struct ProcStack(Vec<ProcState>);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The kinds of procedure that can be started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ProcKind {
    Calibrate,
    Dig,
    Offload,
    Cycle,
    Travel(TravelSite),
}

/// Actions that can be performed on the stack at the end of a state's step.
#[derive(Debug)]
pub enum StackAction {
    None,
    /// Clear the stack and run the cleanup state, recording the given
    /// termination reason.
    Abort(ProcTermination),
    PushAbove(ProcState),
    Pop,
}

/// The states a procedure can be in.
#[derive(Debug)]
pub enum ProcState {
    Stopping(Stopping),
    Calibrate(Calibrate),
    Dig(Dig),
    Offload(Offload),
    Cycle(Cycle),
    Travel(Travel),
}

/// Reason a procedure terminated.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum ProcTermination {
    /// The procedure ran to completion.
    Completed,

    /// The procedure was cancelled by the operator.
    Cancelled,

    /// The navigation service reported a failure.
    NavigationFailed,
}

/// Errors returned synchronously by [`ProcMgr::start`].
#[derive(Debug, thiserror::Error)]
pub enum ProcStartError {
    #[error("A procedure is already running, cannot start {0}")]
    AlreadyRunning(ProcKind),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(&'static str),
}

/// Errors which can occur when initialising the manager.
#[derive(Debug, thiserror::Error)]
pub enum ProcMgrError {
    #[error("Failed to load ProcParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Field layout {0:?} is not defined in the parameters")]
    UnknownFieldLayout(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ProcMgr {
    /// Initialise the manager, loading parameters from the given file.
    pub fn init(&mut self, params_path: &str) -> Result<(), ProcMgrError> {
        self.params = util::params::load(params_path).map_err(ProcMgrError::ParamLoadError)?;
        Ok(())
    }

    /// Get a reference to the manager's parameters.
    pub fn params(&self) -> &ProcParams {
        &self.params
    }

    /// Build the persistent procedure context from the loaded field layout.
    pub fn build_ctx(&self) -> Result<ProcCtx, ProcMgrError> {
        let layout = &self.params.field.layout;
        let sites = self
            .params
            .field
            .layouts
            .get(layout)
            .ok_or_else(|| ProcMgrError::UnknownFieldLayout(layout.clone()))?;

        Ok(ProcCtx {
            calibrated: false,
            dig_site: sites.dig_site.as_pose(),
            berm_site: sites.berm_site.as_pose(),
        })
    }

    /// Start the given procedure.
    ///
    /// Fails with [`ProcStartError::AlreadyRunning`] if a procedure is active,
    /// and with [`ProcStartError::PreconditionFailed`] if the procedure's
    /// preconditions are not met. In both cases no state is changed and no
    /// command is issued.
    pub fn start(&mut self, kind: ProcKind, ctx: &ProcCtx) -> Result<(), ProcStartError> {
        if !self.stack.is_empty() {
            return Err(ProcStartError::AlreadyRunning(kind));
        }

        if matches!(kind, ProcKind::Cycle) && !ctx.calibrated {
            return Err(ProcStartError::PreconditionFailed(
                "the field must be calibrated before a full cycle",
            ));
        }

        self.cancel_pending = false;
        self.pending_termination = None;
        self.finished = None;

        // The cleanup state sits below the root so that a successful run pops
        // into it and stops all equipment before the slot clears
        self.stack.push_above(ProcState::Stopping(Stopping::new()));

        let root = match kind {
            ProcKind::Calibrate => ProcState::Calibrate(Calibrate::new()),
            ProcKind::Dig => ProcState::Dig(Dig::new()),
            ProcKind::Offload => ProcState::Offload(Offload::new()),
            ProcKind::Cycle => ProcState::Cycle(Cycle::new()),
            ProcKind::Travel(site) => ProcState::Travel(Travel::new(site)),
        };
        self.stack.push_above(root);

        self.active = Some(kind);
        info!("Procedure {} started", kind);

        Ok(())
    }

    /// Request cancellation of the running procedure.
    ///
    /// Does not block. The procedure observes the flag at its next step and
    /// runs its cleanup; the termination is reported through
    /// [`ProcMgr::take_termination`] once cleanup has executed.
    pub fn cancel(&mut self) {
        if self.active.is_none() {
            warn!("Cancel requested but no procedure is running");
            return;
        }

        if !self.cancel_pending {
            self.cancel_pending = true;
            info!("Cancellation of {} requested", self.active.unwrap());
        }
    }

    /// The kind of the currently running procedure, or `None` when idle.
    pub fn active_kind(&self) -> Option<ProcKind> {
        self.active
    }

    /// True while a procedure is running.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Take the termination report of a procedure that finished this cycle.
    pub fn take_termination(&mut self) -> Option<(ProcKind, ProcTermination)> {
        self.finished.take()
    }

    /// Step the active procedure.
    ///
    /// Returns the output to be routed to the equipment and service clients.
    /// Returns an empty output when no procedure is active.
    pub fn step(&mut self, ctx: &mut ProcCtx, inputs: &mut ProcInputs) -> ProcOutput {
        let mut output = ProcOutput::default();

        let top = match self.stack.top() {
            Some(t) => t,
            None => return output,
        };

        let step = top.step(&self.params, ctx, inputs, self.cancel_pending);
        output.merge(step.output);

        let is_action = step.action.is_some();

        match step.action {
            StackAction::None => (),
            StackAction::Pop => {
                self.stack.pop();
            }
            StackAction::PushAbove(s) => self.stack.push_above(s),
            StackAction::Abort(reason) => {
                warn!("Procedure {} aborting: {}", self.active.unwrap(), reason);
                self.stack.clear();
                self.pending_termination = Some(reason);

                // Run the cleanup in the same cycle as the abort so the safe
                // stop cannot be delayed behind another tick
                let mut stopping = Stopping::new();
                let cleanup = stopping.step(&self.params, ctx, inputs, false);
                output.merge(cleanup.output);
            }
        }

        if let Some(top) = self.stack.top() {
            if is_action {
                info!("Procedure state change to: {}", top);
            }
        }

        // An empty stack means the procedure has terminated
        if self.stack.is_empty() {
            if let Some(kind) = self.active.take() {
                let term = self
                    .pending_termination
                    .take()
                    .unwrap_or(ProcTermination::Completed);
                self.finished = Some((kind, term));
                self.cancel_pending = false;
            }
        }

        output
    }
}

impl ProcStack {
    /// Returns true if the stack is empty (has no states)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a mutable reference to the top state in the stack. Returns
    /// `None` if the stack is empty.
    pub fn top(&mut self) -> Option<&mut ProcState> {
        self.0.last_mut()
    }

    /// Pushes a new state onto the stack above the current top
    pub fn push_above(&mut self, new: ProcState) {
        self.0.push(new)
    }

    /// Pops the current top of the stack, removing it. Returns `None` if the
    /// stack is empty.
    pub fn pop(&mut self) -> Option<ProcState> {
        self.0.pop()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl ProcState {
    fn step(
        &mut self,
        params: &ProcParams,
        ctx: &mut ProcCtx,
        inputs: &mut ProcInputs,
        cancelled: bool,
    ) -> StepOutput {
        match self {
            ProcState::Stopping(stopping) => stopping.step(params, ctx, inputs, cancelled),
            ProcState::Calibrate(calibrate) => calibrate.step(params, ctx, inputs, cancelled),
            ProcState::Dig(dig) => dig.step(params, ctx, inputs, cancelled),
            ProcState::Offload(offload) => offload.step(params, ctx, inputs, cancelled),
            ProcState::Cycle(cycle) => cycle.step(params, ctx, inputs, cancelled),
            ProcState::Travel(travel) => travel.step(params, ctx, inputs, cancelled),
        }
    }
}

impl StepOutput {
    /// A step which performs no stack action and outputs nothing.
    pub fn none() -> Self {
        Self {
            action: StackAction::None,
            output: ProcOutput::default(),
        }
    }

    /// A step which dispatches the given commands without a stack action.
    pub fn cmds(cmds: Vec<EqptCmd>) -> Self {
        Self {
            action: StackAction::None,
            output: ProcOutput {
                cmds,
                ..Default::default()
            },
        }
    }

    /// A step which aborts the procedure for the given reason.
    pub fn abort(reason: ProcTermination) -> Self {
        Self {
            action: StackAction::Abort(reason),
            output: ProcOutput::default(),
        }
    }
}

impl ProcOutput {
    /// Fold another output into this one, preserving command order.
    pub fn merge(&mut self, other: ProcOutput) {
        self.cmds.extend(other.cmds);
        if other.nav_goal.is_some() {
            self.nav_goal = other.nav_goal;
        }
        self.detect_request |= other.detect_request;
    }
}

impl StackAction {
    pub fn is_some(&self) -> bool {
        !matches!(self, &StackAction::None)
    }
}

impl Display for ProcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcKind::Calibrate => write!(f, "Calibrate"),
            ProcKind::Dig => write!(f, "Dig"),
            ProcKind::Offload => write!(f, "Offload"),
            ProcKind::Cycle => write!(f, "Cycle"),
            ProcKind::Travel(site) => write!(f, "Travel({:?})", site),
        }
    }
}

impl Display for ProcTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcTermination::Completed => write!(f, "completed"),
            ProcTermination::Cancelled => write!(f, "cancelled"),
            ProcTermination::NavigationFailed => write!(f, "navigation failed"),
        }
    }
}

impl Display for ProcState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcState::Stopping(_) => write!(f, "ProcState::Stopping"),
            ProcState::Calibrate(_) => write!(f, "ProcState::Calibrate"),
            ProcState::Dig(_) => write!(f, "ProcState::Dig"),
            ProcState::Offload(_) => write!(f, "ProcState::Offload"),
            ProcState::Cycle(_) => write!(f, "ProcState::Cycle"),
            ProcState::Travel(_) => write!(f, "ProcState::Travel"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use comms_if::{
        eqpt::{EqptCmd, LiftCmd},
        nav::{NavGoal, NavOutcome},
    };

    /// Cycle period used by the test rig, matching the executive.
    pub const RIG_CYCLE_S: f64 = 0.1;

    /// Parameters used by the procedure tests.
    pub fn test_params() -> ProcParams {
        ProcParams::test_values()
    }

    /// A scripted-input harness standing in for the main loop: it dispatches
    /// the manager's outputs back into the inputs the way the executive does
    /// (lift height commands set the tracker goal and clear the reached flag,
    /// navigation goals mark a task as pending).
    pub struct TestRig {
        pub mgr: ProcMgr,
        pub ctx: ProcCtx,
        pub inputs: ProcInputs,

        /// All equipment commands dispatched so far.
        pub cmds: Vec<EqptCmd>,

        /// Dispatch log with the session time each command was issued at.
        pub cmd_log: Vec<(f64, EqptCmd)>,

        /// All navigation goals started so far.
        pub nav_goals: Vec<NavGoal>,

        /// Number of field-detect requests issued so far.
        pub detect_requests: u32,

        /// The last commanded lift height.
        pub lift_goal_m: Option<f64>,
    }

    impl TestRig {
        pub fn new() -> Self {
            let mgr = ProcMgr {
                params: test_params(),
                ..Default::default()
            };
            let ctx = mgr.build_ctx().unwrap();

            Self {
                mgr,
                ctx,
                inputs: ProcInputs::default(),
                cmds: Vec::new(),
                cmd_log: Vec::new(),
                nav_goals: Vec::new(),
                detect_requests: 0,
                lift_goal_m: None,
            }
        }

        /// Advance one cycle, dispatching outputs the way the main loop does.
        pub fn step(&mut self) {
            let output = self.mgr.step(&mut self.ctx, &mut self.inputs);

            for cmd in &output.cmds {
                if let EqptCmd::Lift(LiftCmd::SetHeight { height_m }) = cmd {
                    self.lift_goal_m = Some(*height_m);
                    self.inputs.goal_reached = false;
                }
                self.cmd_log.push((self.inputs.time_s, *cmd));
            }
            self.cmds.extend(output.cmds);

            if let Some(goal) = output.nav_goal {
                self.nav_goals.push(goal);
                self.inputs.nav_pending = true;
            }

            if output.detect_request {
                self.detect_requests += 1;
            }

            self.inputs.time_s += RIG_CYCLE_S;
        }

        /// Resolve the in-flight navigation task with the given outcome.
        pub fn finish_nav(&mut self, outcome: NavOutcome) {
            assert!(self.inputs.nav_pending, "no navigation task in flight");
            self.inputs.nav_pending = false;
            self.inputs.nav_result = Some(outcome);
        }

        /// Count dispatched commands matching the predicate.
        pub fn count_cmds(&self, pred: impl Fn(&EqptCmd) -> bool) -> usize {
            self.cmds.iter().filter(|c| pred(c)).count()
        }

        /// Step until the manager reports a termination, up to `max_cycles`.
        pub fn run_to_termination(&mut self, max_cycles: usize) -> (ProcKind, ProcTermination) {
            for _ in 0..max_cycles {
                self.step();
                if let Some(term) = self.mgr.take_termination() {
                    return term;
                }
            }
            panic!("procedure did not terminate within {} cycles", max_cycles);
        }
    }
}

#[cfg(test)]
mod test {
    use super::test_util::*;
    use super::*;
    use comms_if::{
        eqpt::{DrivetrainCmd, EqptCmd, LiftCmd, SkimmerCmd},
        nav::NavOutcome,
    };

    /// Counts one safe stop as a (drivetrain, lift, skimmer) stop triple.
    fn stop_counts(rig: &TestRig) -> (usize, usize, usize) {
        (
            rig.count_cmds(|c| matches!(c, EqptCmd::Drivetrain(DrivetrainCmd::Stop))),
            rig.count_cmds(|c| matches!(c, EqptCmd::Lift(LiftCmd::Stop))),
            rig.count_cmds(|c| matches!(c, EqptCmd::Skimmer(SkimmerCmd::Stop))),
        )
    }

    #[test]
    fn test_second_start_rejected() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;

        rig.mgr.start(ProcKind::Dig, &ctx).unwrap();
        assert!(matches!(
            rig.mgr.start(ProcKind::Offload, &ctx),
            Err(ProcStartError::AlreadyRunning(_))
        ));
        assert_eq!(rig.mgr.active_kind(), Some(ProcKind::Dig));
    }

    #[test]
    fn test_cycle_requires_calibration() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;

        assert!(matches!(
            rig.mgr.start(ProcKind::Cycle, &ctx),
            Err(ProcStartError::PreconditionFailed(_))
        ));

        // Nothing was pushed, nothing will be commanded
        assert!(!rig.mgr.is_active());
        rig.step();
        assert!(rig.cmds.is_empty());
        assert!(rig.nav_goals.is_empty());
    }

    #[test]
    fn test_cancel_runs_safe_stop_once() {
        let mut rig = TestRig::new();
        let ctx = rig.ctx;

        rig.mgr.start(ProcKind::Dig, &ctx).unwrap();

        // Let the dig lower the skimmer and reach its wait state
        rig.step();
        rig.step();
        assert!(rig.lift_goal_m.is_some());

        // Cancel while waiting on the height goal
        rig.mgr.cancel();
        let (kind, term) = rig.run_to_termination(10);

        assert_eq!(kind, ProcKind::Dig);
        assert_eq!(term, ProcTermination::Cancelled);
        assert_eq!(stop_counts(&rig), (1, 1, 1));
    }

    #[test]
    fn test_full_cycle_interleavings_single_active() {
        // Deterministic LCG driving a pseudo-random start/cancel sequence.
        // Whatever the interleaving, at most one procedure may be active and
        // every termination must have stopped all three subsystems.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        let mut rig = TestRig::new();
        rig.ctx.calibrated = true;
        let mut active = false;
        let mut terminations = 0;
        let mut stops_at_last_check = (0, 0, 0);

        for _ in 0..500 {
            match next() % 10 {
                0..=2 => {
                    let kind = match next() % 4 {
                        0 => ProcKind::Dig,
                        1 => ProcKind::Offload,
                        2 => ProcKind::Cycle,
                        _ => ProcKind::Calibrate,
                    };
                    let ctx = rig.ctx;
                    match rig.mgr.start(kind, &ctx) {
                        Ok(()) => {
                            assert!(!active, "start succeeded while a procedure was active");
                            active = true;
                        }
                        Err(ProcStartError::AlreadyRunning(_)) => {
                            assert!(active, "AlreadyRunning returned while idle");
                        }
                        Err(ProcStartError::PreconditionFailed(_)) => {
                            unreachable!("ctx is calibrated");
                        }
                    }
                }
                3..=4 => rig.mgr.cancel(),
                _ => {
                    // Feed the waits occasionally so procedures make progress
                    if next() % 3 == 0 {
                        rig.inputs.goal_reached = true;
                    }
                    if rig.inputs.nav_pending && next() % 3 == 0 {
                        rig.finish_nav(NavOutcome::Succeeded);
                    }
                }
            }

            rig.step();

            if let Some((_, _)) = rig.mgr.take_termination() {
                assert!(active);
                active = false;
                terminations += 1;

                // Each termination must have issued at least one stop to
                // every subsystem since the last termination
                let counts = stop_counts(&rig);
                assert!(counts.0 > stops_at_last_check.0);
                assert!(counts.1 > stops_at_last_check.1);
                assert!(counts.2 > stops_at_last_check.2);
                stops_at_last_check = counts;
            }

            assert_eq!(rig.mgr.is_active(), active);
        }

        assert!(terminations > 0, "no procedure ever terminated");
    }
}
