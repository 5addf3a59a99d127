//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the typed
//! command and response definitions for each equipment endpoint, the joystick
//! input message, the navigation and vision service protocols, and the
//! network layer itself.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment (drivetrain, lift, skimmer)
pub mod eqpt;

/// Joystick input message definitions
pub mod joy;

/// Navigation service protocol
pub mod nav;

/// Field-calibration (vision) service protocol
pub mod vision;

/// Network module
pub mod net;
