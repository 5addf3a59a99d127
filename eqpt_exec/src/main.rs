//! # Equipment Control Executable
//!
//! This executable serves the robot's equipment command endpoints:
//! - Drivetrain (axis powers mixed to wheel duties)
//! - Lift (skimmer height adjust, closed loop on height)
//! - Skimmer belt (open loop power with toggle)
//!
//! Commands arrive from the control executable over the command socket and
//! are acknowledged individually. Lift height samples are published at the
//! cycle rate for the control executable's goal tracker.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Drivetrain subsystem.
mod drivetrain;

/// Equipment server abstraction.
mod eqpt_server;

/// Lift subsystem.
mod lift;

/// Motor model standing in for the motor controllers.
mod motor;

/// Parameters for the equipment executable.
mod params;

/// Skimmer belt subsystem.
mod skimmer;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use comms_if::eqpt::{EqptCmd, EqptCmdResponse, LiftSample};
use log::{info, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use drivetrain::Drivetrain;
use eqpt_server::EqptServer;
use lift::Lift;
use params::EqptExecParams;
use skimmer::Skimmer;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle, which is also the lift sample period.
const CYCLE_PERIOD_S: f64 = 0.10;

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("eqpt_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Equipment Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: EqptExecParams = util::params::load("eqpt_exec.toml")?;

    info!("Parameters loaded");

    // ---- SUBSYSTEM INITIALISATION ----

    let mut drivetrain = Drivetrain::default();
    let mut lift = Lift::new(params.lift);
    let mut skimmer = Skimmer::default();

    // ---- SERVER INITIALISATION ----

    let mut server = EqptServer::new(&params).wrap_err("Failed to initialise server")?;

    info!("Server initialised");

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop in safe mode");

    let mut safe_mode = true;
    let mut last_update = Instant::now();

    loop {
        let cycle_start_instant = Instant::now();

        // Execute any commands waiting from the client
        while let Some(cmd) = server.get_cmd() {
            trace!("Recieved command: {:?}", cmd);

            let response = exec_cmd(&mut drivetrain, &mut lift, &mut skimmer, &cmd);

            if let Err(e) = server.send_cmd_response(&response) {
                warn!("Could not send response to client: {}", e);
            }
        }

        // Stop everything if the client disappears, commands cannot arrive to
        // do it for us
        if server.client_connected() {
            if safe_mode {
                info!("Client connected, exiting safe mode");
                safe_mode = false;
            }
        } else if !safe_mode {
            warn!("Client connection lost, stopping all subsystems");
            drivetrain.exec(&comms_if::eqpt::DrivetrainCmd::Stop);
            lift.exec(&comms_if::eqpt::LiftCmd::Stop);
            skimmer.exec(&comms_if::eqpt::SkimmerCmd::Stop);
            safe_mode = true;
        }

        // Advance the actuator models
        let dt_s = last_update.elapsed().as_secs_f64();
        last_update = Instant::now();
        lift.update(dt_s);

        // Publish the lift sample for the control executable's goal tracker
        let sample = LiftSample {
            height_m: lift.height_m(),
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = server.publish_lift_sample(&sample) {
            warn!("Could not publish lift sample: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        if let Some(d) = Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            thread::sleep(d);
        } else {
            warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            );
        }
    }
}

/// Execute one command against the subsystems.
///
/// Invalid commands are rejected without actuating anything.
fn exec_cmd(
    drivetrain: &mut Drivetrain,
    lift: &mut Lift,
    skimmer: &mut Skimmer,
    cmd: &EqptCmd,
) -> EqptCmdResponse {
    if !cmd.is_valid() {
        warn!("Rejecting invalid command: {:?}", cmd);
        return EqptCmdResponse::CmdInvalid;
    }

    match cmd {
        EqptCmd::Drivetrain(c) => drivetrain.exec(c),
        EqptCmd::Lift(c) => lift.exec(c),
        EqptCmd::Skimmer(c) => skimmer.exec(c),
    }

    EqptCmdResponse::CmdOk
}
