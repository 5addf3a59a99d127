//! # Equipment Server Module
//!
//! This module abstracts over the networking side of the equipment
//! executable. The server accepts commands from the client in the control
//! executable, and publishes lift height samples back to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{EqptCmd, EqptCmdResponse, LiftSample},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::warn;

use crate::params::EqptExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the equipment executable.
pub struct EqptServer {
    /// REP socket which accepts commands from the client
    cmd_socket: MonitoredSocket,

    /// PUB socket which sends lift samples to the client
    sample_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`EqptServer`]
#[derive(thiserror::Error, Debug)]
pub enum EqptServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send data to the client: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EqptServer {
    /// Create a new instance of the equipment server.
    ///
    /// This function will not wait for a connection from the client before
    /// returning.
    pub fn new(params: &EqptExecParams) -> Result<Self, EqptServerError> {
        let ctx = zmq::Context::new();

        let cmd_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };
        let sample_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            send_timeout: 10,
            ..Default::default()
        };

        let cmd_socket = MonitoredSocket::new(
            &ctx,
            zmq::REP,
            cmd_socket_options,
            &params.cmd_endpoint,
        )
        .map_err(EqptServerError::SocketError)?;
        let sample_socket = MonitoredSocket::new(
            &ctx,
            zmq::PUB,
            sample_socket_options,
            &params.sample_endpoint,
        )
        .map_err(EqptServerError::SocketError)?;

        Ok(Self {
            cmd_socket,
            sample_socket,
        })
    }

    /// True while the control executable is connected.
    pub fn client_connected(&self) -> bool {
        self.cmd_socket.connected()
    }

    /// Retrieve the next command from the client.
    ///
    /// The user MUST call [`EqptServer::send_cmd_response`] before attempting
    /// to retrieve another command.
    ///
    /// `None` is returned when no command is waiting.
    pub fn get_cmd(&mut self) -> Option<EqptCmd> {
        let msg = match self.cmd_socket.recv_msg(0) {
            Ok(m) => m,
            Err(_) => return None,
        };

        match serde_json::from_str(msg.as_str().unwrap_or("")) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                warn!("Could not deserialize command: {}", e);
                // The REP socket still owes a reply
                if let Err(e) = self.send_cmd_response(&EqptCmdResponse::CmdInvalid) {
                    warn!("Could not reject invalid command: {}", e);
                }
                None
            }
        }
    }

    /// Send a response to the client based on the recieved command.
    pub fn send_cmd_response(
        &mut self,
        response: &EqptCmdResponse,
    ) -> Result<(), EqptServerError> {
        let resp_str =
            serde_json::to_string(response).map_err(EqptServerError::SerializationError)?;

        self.cmd_socket
            .send(&resp_str, 0)
            .map_err(EqptServerError::SendError)
    }

    /// Publish a lift height sample.
    pub fn publish_lift_sample(&mut self, sample: &LiftSample) -> Result<(), EqptServerError> {
        let sample_str =
            serde_json::to_string(sample).map_err(EqptServerError::SerializationError)?;

        self.sample_socket
            .send(&sample_str, 0)
            .map_err(EqptServerError::SendError)
    }
}
