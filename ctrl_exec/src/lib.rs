//! # Control library.
//!
//! This library holds the orchestration core of the excavation robot: the
//! mode state machine, the procedure manager, drive input shaping, lift goal
//! tracking, and the client adapters for the external services.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Drive control module - converts joystick axes into rate-limited drive commands
pub mod drive_ctrl;

/// Equipment client - sends subsystem commands to the equipment server
pub mod eqpt_client;

/// Height goal tracker - derives the lift goal-reached signal from samples
pub mod height_ctrl;

/// Joystick processing - button edge detection and gamepad bindings
pub mod joy;

/// Joystick client - receives raw gamepad messages from the driver
pub mod joy_client;

/// Mode manager - arbitrates between teleop and autonomous control
pub mod mode_mgr;

/// Navigation client - start/poll/result contract over the navigation service
pub mod nav_client;

/// Parameters for the control executable
pub mod params;

/// Procedure manager and the autonomous procedure library
pub mod proc;

/// Telemetry server - publishes the control state summary
pub mod tm_server;

/// Vision client - field-calibration detect requests
pub mod vision_client;
