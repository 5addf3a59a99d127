//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable giving the root of the software installation.
///
/// The `params` and `sessions` directories are resolved relative to this
/// root.
pub const SW_ROOT_ENV_VAR: &str = "EXC_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with resolving the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (EXC_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software installation from the environment.
pub fn get_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
