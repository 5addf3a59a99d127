//! # Telemetry Server
//!
//! Publishes a per-cycle summary of the control executable's state for any
//! listening ground tooling.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::DrivetrainCmd,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use serde::Serialize;

use crate::{
    mode_mgr::Mode,
    params::CtrlExecParams,
    proc::ProcKind,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry packet summarising the control state.
#[derive(Debug, Clone, Serialize)]
pub struct CtrlTm {
    /// Current operating mode.
    pub mode: Mode,

    /// The running procedure, if any.
    pub active_proc: Option<ProcKind>,

    /// True once field calibration has succeeded this session.
    pub calibrated: bool,

    /// The commanded lift height goal.
    pub lift_goal_m: Option<f64>,

    /// The latest measured lift height.
    pub lift_height_m: Option<f64>,

    /// True when the lift is at its goal.
    pub lift_goal_reached: bool,

    /// The last shaped drive command published during teleop.
    pub drive_cmd: Option<DrivetrainCmd>,
}

pub struct TmServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send the telemetry: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the telemetry server.
    pub fn new(ctx: &zmq::Context, params: &CtrlExecParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.tm_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish the given telemetry packet.
    pub fn send(&mut self, tm: &CtrlTm) -> Result<(), TmServerError> {
        let tm_str = serde_json::to_string(tm).map_err(TmServerError::SerializationError)?;

        self.socket
            .send(&tm_str, 0)
            .map_err(TmServerError::SendError)
    }
}
