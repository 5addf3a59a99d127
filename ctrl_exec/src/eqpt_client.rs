//! # Equipment Client
//!
//! Networking abstractions to connect to the equipment server. Commands are
//! sent over a REQ socket and acknowledged by the server; lift height samples
//! arrive on a SUB socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{thread, time::Duration};

use comms_if::{
    eqpt::{DrivetrainCmd, EqptCmd, EqptCmdResponse, LiftCmd, LiftSample, SkimmerCmd},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::warn;

use crate::params::CtrlExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct EqptClient {
    cmd_socket: MonitoredSocket,

    sample_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum EqptClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send the command to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EqptClient {
    /// Create a new instance of the equipment client.
    ///
    /// This function will not block until the server connects.
    pub fn new(ctx: &zmq::Context, params: &CtrlExecParams) -> Result<Self, EqptClientError> {
        let cmd_socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 200,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };
        let sample_socket_options = SocketOptions {
            block_on_first_connect: false,
            recv_timeout: 0,
            ..Default::default()
        };

        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            cmd_socket_options,
            &params.eqpt_cmd_endpoint,
        )
        .map_err(EqptClientError::SocketError)?;
        let sample_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            sample_socket_options,
            &params.eqpt_sample_endpoint,
        )
        .map_err(EqptClientError::SocketError)?;

        // Subscribe to all sample messages
        sample_socket
            .set_subscribe(b"")
            .map_err(|e| EqptClientError::SocketError(MonitoredSocketError::SocketOptionError(
                "set_subscribe".into(),
                e,
            )))?;

        Ok(Self {
            cmd_socket,
            sample_socket,
        })
    }

    /// Check if the client is connected to the server
    pub fn connected(&self) -> bool {
        self.cmd_socket.connected()
    }

    /// Block until the equipment server is reachable.
    ///
    /// Retries indefinitely at the given interval, warning each time. Startup
    /// ordering of the hardware-side executables cannot be enforced, so there
    /// is deliberately no upper bound here.
    pub fn wait_for_server(&self, retry_interval: Duration) {
        while !self.connected() {
            warn!("Waiting for the equipment server to be available");
            thread::sleep(retry_interval);
        }
    }

    /// Send a command to the server and wait for its acknowledgement.
    pub fn send_cmd(&mut self, cmd: &EqptCmd) -> Result<EqptCmdResponse, EqptClientError> {
        if !self.cmd_socket.connected() {
            return Err(EqptClientError::NotConnected);
        }

        let cmd_str =
            serde_json::to_string(cmd).map_err(EqptClientError::SerializationError)?;

        self.cmd_socket
            .send(&cmd_str, 0)
            .map_err(EqptClientError::SendError)?;

        let msg = self
            .cmd_socket
            .recv_msg(0)
            .map_err(EqptClientError::RecvError)?;

        serde_json::from_str(msg.as_str().unwrap_or(""))
            .map_err(EqptClientError::DeserializeError)
    }

    /// Command the safe stop: zero power to the drivetrain, lift, and
    /// skimmer belt.
    ///
    /// Idempotent, and best-effort by design: a failure to deliver one stop
    /// must not prevent the others being attempted, so errors are logged
    /// rather than returned.
    pub fn safe_stop_all(&mut self) {
        let stops = [
            EqptCmd::Drivetrain(DrivetrainCmd::Stop),
            EqptCmd::Lift(LiftCmd::Stop),
            EqptCmd::Skimmer(SkimmerCmd::Stop),
        ];

        for stop in &stops {
            if let Err(e) = self.send_cmd(stop) {
                warn!("Could not send {:?} during safe stop: {}", stop, e);
            }
        }
    }

    /// Get the next lift height sample from the server, if one is waiting.
    pub fn recv_lift_sample(&mut self) -> Option<LiftSample> {
        let msg = match self.sample_socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Recieved a non UTF-8 lift sample");
                return None;
            }
            Err(zmq::Error::EAGAIN) => return None,
            Err(e) => {
                warn!("Could not read from the sample socket: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&msg) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("Could not deserialize lift sample: {}", e);
                None
            }
        }
    }
}
