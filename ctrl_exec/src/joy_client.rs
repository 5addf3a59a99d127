//! # Joystick Client
//!
//! Receives raw joystick messages published by the joystick driver.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    joy::JoyMsg,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::warn;

use crate::params::CtrlExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct JoyClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum JoyClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JoyClient {
    /// Create a new instance of the joystick client.
    ///
    /// This function will not block until the driver connects.
    pub fn new(ctx: &zmq::Context, params: &CtrlExecParams) -> Result<Self, JoyClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            recv_timeout: 0,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.joy_endpoint)
            .map_err(JoyClientError::SocketError)?;

        socket.set_subscribe(b"").map_err(|e| {
            JoyClientError::SocketError(MonitoredSocketError::SocketOptionError(
                "set_subscribe".into(),
                e,
            ))
        })?;

        Ok(Self { socket })
    }

    /// Get the next joystick message, if one is waiting.
    pub fn recv_msg(&mut self) -> Option<JoyMsg> {
        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Recieved a non UTF-8 joystick message");
                return None;
            }
            Err(zmq::Error::EAGAIN) => return None,
            Err(e) => {
                warn!("Could not read from the joystick socket: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&msg) {
            Ok(joy) => Some(joy),
            Err(e) => {
                warn!("Could not deserialize joystick message: {}", e);
                None
            }
        }
    }
}
