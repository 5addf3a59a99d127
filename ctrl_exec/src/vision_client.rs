//! # Vision Client
//!
//! Client for the field-calibration endpoint of the vision pipeline. A detect
//! request is fired without blocking; the answer is collected by polling on
//! later cycles, so the executive never stalls waiting on the camera.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    vision::{VisionRequest, VisionResponse},
};
use log::warn;

use crate::params::CtrlExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct VisionClient {
    socket: MonitoredSocket,

    /// True while a detect request is awaiting its response.
    outstanding: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum VisionClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the vision service")]
    NotConnected,

    #[error("A detect request is already outstanding")]
    RequestOutstanding,

    #[error("Could not send the request: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionClient {
    /// Create a new instance of the vision client.
    ///
    /// This function will not block until the service connects.
    pub fn new(ctx: &zmq::Context, params: &CtrlExecParams) -> Result<Self, VisionClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 0,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REQ, socket_options, &params.vision_endpoint)
            .map_err(VisionClientError::SocketError)?;

        Ok(Self {
            socket,
            outstanding: false,
        })
    }

    /// Fire one detect-and-reset-odometry request.
    pub fn request_detect(&mut self) -> Result<(), VisionClientError> {
        if self.outstanding {
            return Err(VisionClientError::RequestOutstanding);
        }
        if !self.socket.connected() {
            return Err(VisionClientError::NotConnected);
        }

        let req_str = serde_json::to_string(&VisionRequest::DetectAndResetOdometry)
            .map_err(VisionClientError::SerializationError)?;

        self.socket
            .send(&req_str, 0)
            .map_err(VisionClientError::SendError)?;

        self.outstanding = true;
        Ok(())
    }

    /// Collect the answer to an outstanding detect request, if it has
    /// arrived.
    pub fn poll_result(&mut self) -> Option<bool> {
        if !self.outstanding {
            return None;
        }

        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Recieved a non UTF-8 vision response");
                self.outstanding = false;
                return None;
            }
            Err(zmq::Error::EAGAIN) => return None,
            Err(e) => {
                warn!("Could not read from the vision socket: {}", e);
                return None;
            }
        };

        self.outstanding = false;

        match serde_json::from_str(&msg) {
            Ok(VisionResponse::Detect { success }) => Some(success),
            Err(e) => {
                warn!("Could not deserialize vision response: {}", e);
                None
            }
        }
    }
}
