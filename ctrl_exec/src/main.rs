//! Main control executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single-threaded cyclic executive:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Input acquisition:
//!             - Joystick messages
//!             - Lift height samples
//!             - Vision responses
//!             - Navigation task polling
//!         - Teleop processing (drive shaping, button actions)
//!         - Procedure processing (autonomous mode)
//!         - Command dispatch
//!         - Telemetry
//!
//! Exactly one of the joystick and the procedure manager commands the
//! actuators on any cycle, arbitrated by the mode manager. Procedures observe
//! cancellation at step boundaries only, so every command dispatch below
//! happens between steps, never concurrently with one.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use ctrl_lib::{
    data_store::DataStore,
    drive_ctrl,
    eqpt_client::EqptClient,
    joy::JoyAction,
    joy_client::JoyClient,
    mode_mgr::Mode,
    nav_client::NavClient,
    params::CtrlExecParams,
    proc::{ProcInputs, ProcKind},
    tm_server::{CtrlTm, TmServer},
    vision_client::VisionClient,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use comms_if::{
    eqpt::{EqptCmd, EqptCmdResponse, LiftCmd, SkimmerCmd},
    joy::JoyMsg,
    nav::NavOutcome,
};
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_lib::height_ctrl::HeightTracker;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Interval between retries while waiting for the equipment server.
const EQPT_RETRY_INTERVAL_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Excavation Robot Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: CtrlExecParams =
        util::params::load("ctrl_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.drive_ctrl
        .init("drive_ctrl.toml", &session)
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    ds.proc_mgr
        .init("proc.toml")
        .wrap_err("Failed to initialise ProcMgr")?;
    ds.proc_ctx = ds
        .proc_mgr
        .build_ctx()
        .wrap_err("Failed to build the procedure context")?;
    info!("ProcMgr init complete");

    ds.height_tracker.set_threshold(params.lift_goal_threshold_m);

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut eqpt_client = EqptClient::new(&zmq_ctx, &params)
        .wrap_err("Failed to initialise EqptClient")?;
    info!("EqptClient initialised");

    let mut nav_client =
        NavClient::new(&zmq_ctx, &params).wrap_err("Failed to initialise NavClient")?;
    info!("NavClient initialised");

    let mut vision_client =
        VisionClient::new(&zmq_ctx, &params).wrap_err("Failed to initialise VisionClient")?;
    info!("VisionClient initialised");

    let mut joy_client =
        JoyClient::new(&zmq_ctx, &params).wrap_err("Failed to initialise JoyClient")?;
    info!("JoyClient initialised");

    let mut tm_server =
        TmServer::new(&zmq_ctx, &params).wrap_err("Failed to initialise TmServer")?;
    info!("TmServer initialised");

    info!("Network initialisation complete");

    // The equipment server must be up before any command can be actuated.
    // This wait is deliberately unbounded: startup ordering of the
    // hardware-side executables cannot be enforced.
    eqpt_client.wait_for_server(Duration::from_secs_f64(EQPT_RETRY_INTERVAL_S));
    info!("Equipment server available");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- INPUT ACQUISITION ----

        while let Some(msg) = joy_client.recv_msg() {
            handle_joy_msg(&mut ds, &params, &mut eqpt_client, &msg);
        }

        while let Some(sample) = eqpt_client.recv_lift_sample() {
            ds.height_tracker.on_sample(sample.height_m);
        }

        if let Some(success) = vision_client.poll_result() {
            // A response landing after its procedure has ended must not be
            // consumed by the next one
            if ds.mode_mgr.mode() == Mode::Autonomous {
                ds.detect_result = Some(success);
            } else {
                debug!("Discarding vision response recieved in teleop");
            }
        }

        // Poll the in-flight navigation task, if any
        if let Some(handle) = ds.nav_task.take() {
            match nav_client.is_complete(&handle) {
                Ok(true) => match nav_client.get_result(handle) {
                    Ok(outcome) => ds.nav_result = Some(outcome),
                    Err(e) => {
                        warn!("Could not get the navigation result: {}", e);
                        ds.nav_result = Some(NavOutcome::Failed);
                    }
                },
                Ok(false) => ds.nav_task = Some(handle),
                Err(e) => {
                    // Keep the handle, the poll is retried next cycle
                    warn!("Navigation status poll failed: {}", e);
                    ds.nav_task = Some(handle);
                }
            }
        }

        // ---- PROCEDURE PROCESSING ----

        if ds.mode_mgr.mode() == Mode::Autonomous {
            let mut inputs = ProcInputs {
                time_s: session::get_elapsed_seconds(),
                goal_reached: ds.height_tracker.reached(),
                nav_pending: ds.nav_task.is_some(),
                nav_result: ds.nav_result.take(),
                detect_result: ds.detect_result.take(),
            };

            let output = ds.proc_mgr.step(&mut ds.proc_ctx, &mut inputs);

            for cmd in &output.cmds {
                dispatch_cmd(&mut ds.height_tracker, &mut eqpt_client, cmd);
            }

            if let Some(goal) = output.nav_goal {
                match nav_client.start(goal) {
                    Ok(handle) => ds.nav_task = Some(handle),
                    Err(e) => {
                        warn!("Could not start navigation goal: {}", e);
                        ds.nav_result = Some(NavOutcome::Failed);
                    }
                }
            }

            if output.detect_request {
                if let Err(e) = vision_client.request_detect() {
                    warn!("Could not request field detection: {}", e);
                    // Read as a failed detection, the procedure retries on
                    // its own interval
                    ds.detect_result = Some(false);
                }
            }

            if let Some((kind, term)) = ds.proc_mgr.take_termination() {
                ds.mode_mgr.on_procedure_finished(kind, term);

                // Drop any in-flight task state so a later procedure cannot
                // consume a stale outcome. The navigation service finishes the
                // abandoned task on its own; safe stop has already zeroed the
                // actuators.
                ds.nav_task = None;
                ds.nav_result = None;
                ds.detect_result = None;
            }
        }

        // ---- TELEMETRY ----

        let tm = CtrlTm {
            mode: ds.mode_mgr.mode(),
            active_proc: ds.proc_mgr.active_kind(),
            calibrated: ds.proc_ctx.calibrated,
            lift_goal_m: ds.height_tracker.goal_m(),
            lift_height_m: ds.height_tracker.measured_m(),
            lift_goal_reached: ds.height_tracker.reached(),
            drive_cmd: ds.last_drive_cmd,
        };
        match tm_server.send(&tm) {
            Ok(_) => (),
            Err(e) => warn!("TmServer error: {}", e),
        };

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.num_cycles += 1;
    }
}

/// Process one joystick message.
///
/// Always updates the button edge state. Drive shaping and equipment actions
/// apply in teleop only; the procedure start/cancel buttons always work.
fn handle_joy_msg(
    ds: &mut DataStore,
    params: &CtrlExecParams,
    eqpt_client: &mut EqptClient,
    msg: &JoyMsg,
) {
    let (axes, actions) = ds.joy_proc.proc(msg);

    // Drive the robot with the shaped axes during teleop, publishing one
    // combined command per input event
    if ds.mode_mgr.mode() == Mode::Teleop {
        let input = drive_ctrl::InputData {
            axes,
            time_s: session::get_elapsed_seconds(),
        };

        match ds.drive_ctrl.proc(&input) {
            Ok((out, report)) => {
                ds.drive_ctrl_report = report;
                ds.last_drive_cmd = Some(out.cmd);
                dispatch_cmd(
                    &mut ds.height_tracker,
                    eqpt_client,
                    &EqptCmd::Drivetrain(out.cmd),
                );
            }
            Err(e) => warn!("Error during DriveCtrl processing: {}", e),
        }
    }

    for action in actions {
        match action {
            // Procedure buttons work in either mode
            JoyAction::StartOrCancel(kind) => handle_proc_button(ds, kind),

            // Everything else is teleop-only
            _ if ds.mode_mgr.mode() != Mode::Teleop => {
                debug!("Teleop action {:?} ignored in autonomous mode", action);
            }

            JoyAction::ToggleBelt => dispatch_cmd(
                &mut ds.height_tracker,
                eqpt_client,
                &EqptCmd::Skimmer(SkimmerCmd::Toggle {
                    power: params.teleop_belt_power,
                }),
            ),
            JoyAction::ReverseBelt => dispatch_cmd(
                &mut ds.height_tracker,
                eqpt_client,
                &EqptCmd::Skimmer(SkimmerCmd::SetPower {
                    power: -params.teleop_belt_power,
                }),
            ),
            JoyAction::LiftToDigHeight => {
                let height_m = ds.proc_mgr.params().dig.digging_height_m;
                dispatch_cmd(
                    &mut ds.height_tracker,
                    eqpt_client,
                    &EqptCmd::Lift(LiftCmd::SetHeight { height_m }),
                )
            }
            JoyAction::LiftToDumpHeight => {
                let height_m = ds.proc_mgr.params().offload.dump_height_m;
                dispatch_cmd(
                    &mut ds.height_tracker,
                    eqpt_client,
                    &EqptCmd::Lift(LiftCmd::SetHeight { height_m }),
                )
            }
            JoyAction::LiftManualRaise => dispatch_cmd(
                &mut ds.height_tracker,
                eqpt_client,
                &EqptCmd::Lift(LiftCmd::SetPower {
                    power: params.lift_manual_power,
                }),
            ),
            JoyAction::LiftManualLower => dispatch_cmd(
                &mut ds.height_tracker,
                eqpt_client,
                &EqptCmd::Lift(LiftCmd::SetPower {
                    power: -params.lift_manual_power,
                }),
            ),
            JoyAction::LiftManualStop => dispatch_cmd(
                &mut ds.height_tracker,
                eqpt_client,
                &EqptCmd::Lift(LiftCmd::Stop),
            ),
        }
    }
}

/// Handle a procedure start/cancel button press.
fn handle_proc_button(ds: &mut DataStore, kind: ProcKind) {
    match ds.mode_mgr.mode() {
        Mode::Teleop => {
            if let Err(e) = ds
                .mode_mgr
                .request_autonomous(kind, &mut ds.proc_mgr, &ds.proc_ctx)
            {
                warn!("{}", e);
            }
        }
        Mode::Autonomous => {
            // The button of the running procedure cancels it
            if ds.proc_mgr.active_kind() == Some(kind) {
                ds.mode_mgr.request_cancel(&mut ds.proc_mgr);
            } else {
                warn!(
                    "Procedure {} is running, {} request ignored",
                    ds.proc_mgr.active_kind().unwrap(),
                    kind
                );
            }
        }
    }
}

/// Dispatch one equipment command.
///
/// Lift height commands also set the goal tracker so the reached flag is
/// cleared before any procedure can poll it.
fn dispatch_cmd(tracker: &mut HeightTracker, eqpt_client: &mut EqptClient, cmd: &EqptCmd) {
    if let EqptCmd::Lift(LiftCmd::SetHeight { height_m }) = cmd {
        tracker.set_goal(*height_m);
    }

    match eqpt_client.send_cmd(cmd) {
        Ok(EqptCmdResponse::CmdOk) => (),
        Ok(r) => warn!("Equipment server rejected {:?}: {:?}", cmd, r),
        Err(e) => warn!("Could not send {:?}: {}", cmd, e),
    }
}
