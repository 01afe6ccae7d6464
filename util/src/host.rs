//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "ATOM_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with locating the software root.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (ATOM_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the path to the software root directory.
///
/// The root is the checkout directory containing `params/` and `sessions/`,
/// and is pointed at by the `ATOM_SW_ROOT` environment variable.
pub fn get_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
