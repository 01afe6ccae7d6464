//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for one arm axis controller.
#[derive(Debug, Clone, Deserialize)]
pub struct ArmParams {
    // ---- CONTROL LAW ----
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Commanded-power magnitude below which the axis is considered to have
    /// converged on the target.
    ///
    /// Units: motor power fraction
    pub power_tolerance: f64,

    /// Scale applied to operator input in manual mode.
    pub manual_speed_multiplier: f64,

    // ---- PRESET POSITIONS ----
    /// Position the axis is held at while driving between field positions.
    ///
    /// Units: encoder pulses
    pub driving_position: f64,

    /// Position at which the end effector is level with the floor.
    ///
    /// Units: encoder pulses
    pub level_position: f64,

    /// Position the axis moves to when scoring on the backdrop.
    ///
    /// Units: encoder pulses
    pub scoring_position: f64,

    /// Position the axis rests at for intaking, near the hard stop.
    ///
    /// Units: encoder pulses
    pub intake_position: f64,
}
