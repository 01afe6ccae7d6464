//! # Autonomous executive library.
//!
//! This library implements the autonomous-period orchestration engine for the
//! robot: a cooperative command scheduler, the motion primitives it runs, a
//! closed-loop arm controller, the route decision tree, and the phase state
//! machine which drives them all from a single external tick.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - closed-loop position control of a single arm axis
pub mod arm_ctrl;

/// Autonomous manager - the phase state machine driving the whole period
pub mod auto_mgr;

/// Match configuration - alliance, stage side, spike mark and `flip`
pub mod match_config;

/// Motion primitives - the leaf operations routes are built from
pub mod motion;

/// Hardware port traits - the seams to the hardware-facing collaborators
pub mod ports;

/// Route builder - the decision tree mapping configuration to command trees
pub mod route;

/// Command scheduler - cooperative executor with resource exclusivity
pub mod sched;

/// Simulation models - in-memory port implementations for bench runs and tests
pub mod sim;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle.
pub const CYCLE_PERIOD_S: f64 = 0.05;

/// Number of cycles per second
pub const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Length of the autonomous period.
pub const MATCH_AUTO_PERIOD_S: f64 = 30.0;
