//! Arm control module
//!
//! Closed-loop position control for a single arm axis (the elbow or the
//! linear slide). Each physical axis gets its own [`ArmCtrl`] instance; no
//! controller state is shared between axes.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pid;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use pid::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sentinel target meaning "retract onto the lower hard stop".
///
/// The hard stop defines the zero reference, so a zero target and a full
/// retraction coincide: the axis is driven at constant full negative power
/// until the limit switch engages or the deadline expires, rather than being
/// servoed by the PID law.
pub const RETRACT_TARGET: f64 = 0.0;

/// Power applied while retracting to the hard stop.
pub const RETRACT_POWER: f64 = -1.0;
