//! Hardware port traits
//!
//! The core never touches hardware directly. Everything it needs from the
//! robot is expressed as one of the four traits below, implemented by
//! hardware-facing adapters at the composition root (or by the [`crate::sim`]
//! models on the bench). This keeps the whole engine runnable and testable
//! without a robot attached.

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Drivetrain operations.
///
/// Each motion call starts a manoeuvre in the drivetrain's own closed loop;
/// the core only polls [`DrivetrainPort::motion_complete`] to sequence them.
/// Starting a new manoeuvre replaces any in progress.
pub trait DrivetrainPort {
    /// Drive straight for the given distance. Negative distances reverse.
    ///
    /// Units: inches
    fn drive(&mut self, distance_in: f64);

    /// Strafe laterally for the given distance. Positive is alliance-left
    /// before flipping.
    ///
    /// Units: inches
    fn strafe(&mut self, distance_in: f64);

    /// Turn by a heading delta, open-loop terminated by displacement.
    ///
    /// Units: degrees
    fn turn(&mut self, delta_heading_deg: f64);

    /// Turn to an absolute heading, closed loop at the standard gain.
    ///
    /// Units: degrees
    fn turn_to_heading(&mut self, heading_deg: f64);

    /// Turn to an absolute heading with reduced gain and a tighter settle
    /// requirement, for final-approach precision.
    ///
    /// Units: degrees
    fn slow_turn_to_heading(&mut self, heading_deg: f64);

    /// True once the most recently started manoeuvre has settled. True when
    /// no manoeuvre has been started.
    fn motion_complete(&self) -> bool;

    /// Immediately zero all drive powers.
    fn stop(&mut self);
}

/// A single closed-loop actuator axis (elbow or linear slide).
pub trait ActuatorPort {
    /// Current measured position of the axis.
    ///
    /// Units: encoder pulses, zero at the lower hard stop
    fn current_position(&self) -> f64;

    /// Apply open-loop power to the axis motor, in [-1, 1], positive away
    /// from the hard stop.
    fn set_power(&mut self, power: f64);

    /// True while the travel-limit switch at the lower hard stop is engaged.
    fn limit_switch_engaged(&self) -> bool;

    /// Re-zero the position reference. Called when the axis is known to be
    /// resting on the hard stop.
    fn reset_position(&mut self);
}

/// The pair of distance sensors used to find the game piece at match start.
///
/// The near/far naming is alliance-relative: the adapter behind this trait is
/// responsible for mapping the physical left/right sensors onto it.
pub trait SpikeSensorPort {
    /// True if something blocks the alliance-near sensor.
    fn is_near_blocked(&self) -> bool;

    /// True if something blocks the alliance-far sensor.
    fn is_far_blocked(&self) -> bool;
}

/// Monotonic time source sampled once per tick.
pub trait ClockPort {
    /// Seconds elapsed since the clock was constructed. Monotonic.
    fn elapsed_seconds(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The full set of ports handed to the core on every tick.
///
/// Held by reference so the caller keeps ownership of the adapters between
/// ticks; the core stores no hardware state of its own.
pub struct Ports<'a> {
    pub drivetrain: &'a mut dyn DrivetrainPort,
    pub elbow: &'a mut dyn ActuatorPort,
    pub slide: &'a mut dyn ActuatorPort,
    pub spike_sensors: &'a dyn SpikeSensorPort,
    pub clock: &'a dyn ClockPort,
}
