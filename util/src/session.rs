//! Session management
//!
//! A session is a single execution of one of the workspace's executables. It
//! owns a timestamped directory under `sessions/` which collects the log file
//! and any data saved during the run, and it defines the session epoch that
//! all log timestamps are measured from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::warn;
use serde::Serialize;
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which displays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (ATOM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised \
         the session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        match SESSION_EPOCH.try_init_once(Utc::now) {
            Ok(_) => (),
            Err(e) => return Err(SessionError::CannotInitEpoch(e)),
        };

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Get the root directory
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        // Create the session path
        let mut path: PathBuf = root;
        path.push(String::from(sessions_dir));
        path.push(format!("{}_{}", exec_name, timestamp));

        match fs::create_dir_all(path.clone()) {
            Ok(_) => (),
            Err(e) => return Err(SessionError::CannotCreateDir(e)),
        };

        // Create the log file path
        let mut log_file_path = path.clone();
        log_file_path.push(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            log_file_path,
        })
    }

    /// Save the given data as pretty JSON at the given session-relative path.
    ///
    /// Saving is best-effort: failures are logged as warnings rather than
    /// propagated, since a failed report write must never abort a run.
    pub fn save<P: AsRef<Path>, T: Serialize>(&self, path: P, data: &T) {
        let full_path = self.session_root.join(path.as_ref());

        if let Some(parent) = full_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(
                    "Couldn't create parent directory for {:?}: {}",
                    full_path, e
                );
                return;
            }
        }

        let file = match OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&full_path)
        {
            Ok(f) => f,
            Err(e) => {
                warn!("Couldn't create file {:?}: {}", full_path, e);
                return;
            }
        };

        if let Err(e) = serde_json::to_writer_pretty(&file, data) {
            warn!("Couldn't serialise data for file {:?}: {}", full_path, e);
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns zero if the session epoch has not been initialised yet, which
/// allows logging before the session exists (and from test harnesses which
/// never create one).
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            time::duration_to_seconds(elapsed).unwrap_or(f64::NAN)
        }
        None => 0.0,
    }
}

/// Return a reference to the session's epoch, if the session has been
/// initialised.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}
