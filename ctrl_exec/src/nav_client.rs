//! # Navigation Client
//!
//! Uniform asynchronous contract over the external navigation service. Each
//! `start_*` call returns a [`NavTaskHandle`]; the caller polls
//! [`NavClient::is_complete`] at the cycle rate and finally consumes the
//! handle with [`NavClient::get_result`]. Polling rather than blocking keeps
//! procedure cancellation responsive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    nav::{NavGoal, NavOutcome, NavRequest, NavResponse, Pose2},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use crate::params::CtrlExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Opaque handle to an in-flight navigation task.
///
/// Not copyable: the handle is consumed exactly once by
/// [`NavClient::get_result`].
#[derive(Debug)]
pub struct NavTaskHandle {
    task_id: u64,
}

pub struct NavClient {
    socket: MonitoredSocket,

    /// Outcome recieved during polling, held until the handle is consumed.
    cached_outcome: Option<(u64, NavOutcome)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NavClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the navigation service")]
    NotConnected,

    #[error("Could not send the request: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a response: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The navigation service rejected the goal")]
    GoalRejected,

    #[error("The navigation service sent an unexpected response")]
    UnexpectedResponse,

    #[error("The task's result was requested before it completed")]
    TaskNotComplete,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavTaskHandle {
    pub fn task_id(&self) -> u64 {
        self.task_id
    }
}

impl NavClient {
    /// Create a new instance of the navigation client.
    ///
    /// This function will not block until the service connects.
    pub fn new(ctx: &zmq::Context, params: &CtrlExecParams) -> Result<Self, NavClientError> {
        let socket_options = SocketOptions {
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

        let socket = MonitoredSocket::new(ctx, zmq::REQ, socket_options, &params.nav_endpoint)
            .map_err(NavClientError::SocketError)?;

        Ok(Self {
            socket,
            cached_outcome: None,
        })
    }

    /// Check if the client is connected to the service
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }

    /// Start navigating to the given pose.
    pub fn start_go_to_pose(&mut self, pose: Pose2) -> Result<NavTaskHandle, NavClientError> {
        self.start(NavGoal::GoToPose(pose))
    }

    /// Start driving on the current heading for the given distance.
    pub fn start_drive_on_heading(
        &mut self,
        distance_m: f64,
        speed_ms: f64,
    ) -> Result<NavTaskHandle, NavClientError> {
        self.start(NavGoal::DriveOnHeading {
            distance_m,
            speed_ms,
        })
    }

    /// Start a spin on the spot by the given angle.
    pub fn start_spin(&mut self, angle_rad: f64) -> Result<NavTaskHandle, NavClientError> {
        self.start(NavGoal::Spin { angle_rad })
    }

    /// Start executing the given goal.
    pub fn start(&mut self, goal: NavGoal) -> Result<NavTaskHandle, NavClientError> {
        match self.request(&NavRequest::Start(goal))? {
            NavResponse::Accepted { task_id } => Ok(NavTaskHandle { task_id }),
            NavResponse::Rejected => Err(NavClientError::GoalRejected),
            _ => Err(NavClientError::UnexpectedResponse),
        }
    }

    /// Poll whether the task has finished.
    ///
    /// When this returns `Ok(true)` the outcome is held by the client and
    /// must be collected with [`NavClient::get_result`].
    pub fn is_complete(&mut self, handle: &NavTaskHandle) -> Result<bool, NavClientError> {
        if let Some((id, _)) = self.cached_outcome {
            if id == handle.task_id {
                return Ok(true);
            }
        }

        match self.request(&NavRequest::Status {
            task_id: handle.task_id,
        })? {
            NavResponse::Pending => Ok(false),
            NavResponse::Done(outcome) => {
                self.cached_outcome = Some((handle.task_id, outcome));
                Ok(true)
            }
            _ => Err(NavClientError::UnexpectedResponse),
        }
    }

    /// Collect the outcome of a completed task, consuming its handle.
    pub fn get_result(&mut self, handle: NavTaskHandle) -> Result<NavOutcome, NavClientError> {
        if let Some((id, outcome)) = self.cached_outcome {
            if id == handle.task_id {
                self.cached_outcome = None;
                return Ok(outcome);
            }
        }

        match self.request(&NavRequest::Status {
            task_id: handle.task_id,
        })? {
            NavResponse::Done(outcome) => Ok(outcome),
            NavResponse::Pending => Err(NavClientError::TaskNotComplete),
            _ => Err(NavClientError::UnexpectedResponse),
        }
    }

    /// Perform one request/response exchange with the service.
    fn request(&mut self, request: &NavRequest) -> Result<NavResponse, NavClientError> {
        if !self.socket.connected() {
            return Err(NavClientError::NotConnected);
        }

        let req_str =
            serde_json::to_string(request).map_err(NavClientError::SerializationError)?;

        self.socket
            .send(&req_str, 0)
            .map_err(NavClientError::SendError)?;

        let msg = self
            .socket
            .recv_msg(0)
            .map_err(NavClientError::RecvError)?;

        serde_json::from_str(msg.as_str().unwrap_or("")).map_err(NavClientError::DeserializeError)
    }
}
