//! Autonomous controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::arm_ctrl::ArmParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the autonomous controller.
///
/// Loaded from `auto_ctrl.toml` under the parameters directory.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoCtrlParams {
    /// Control parameters for the elbow joint.
    pub elbow: ArmParams,

    /// Control parameters for the linear slide.
    pub slide: ArmParams,
}
