//! Motion primitives module
//!
//! The leaf operations route sequences are built from: drivetrain manoeuvres,
//! clock-based waits, and closed-loop arm moves. Each primitive carries its
//! numeric argument in the drivetrain's native units (inches / degrees) or
//! encoder pulses for the arm axes.
//!
//! Primitives hold their own resume state (a wait's start mark, an arm move's
//! armed flag); nothing lives on a call stack between ticks.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::arm_ctrl::ArmCtrl;
use crate::ports::Ports;
use crate::sched::ResourceSet;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Duration of the settle wait appended to the end of every generated route.
///
/// This absorbs mechanical settling after the last motion primitive stops, so
/// phase transitions never fire on a motor that is still decelerating.
pub const SETTLE_WAIT_S: f64 = 0.25;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything a command needs to act on the robot for one tick.
///
/// Bundles the hardware ports with the per-axis arm controllers, which are
/// core state rather than hardware and so live with the phase machine.
pub struct CmdCtx<'a, 'p> {
    pub ports: &'a mut Ports<'p>,
    pub elbow_ctrl: &'a mut ArmCtrl,
    pub slide_ctrl: &'a mut ArmCtrl,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single leaf motion.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// Drive straight, negative reverses.
    ///
    /// Units: inches
    Drive(f64),

    /// Strafe laterally.
    ///
    /// Units: inches
    Strafe(f64),

    /// Relative turn, open-loop terminated by displacement.
    ///
    /// Units: degrees
    Turn(f64),

    /// Closed-loop turn to an absolute heading at the standard gain.
    ///
    /// Units: degrees
    TurnToHeading(f64),

    /// Closed-loop turn to an absolute heading at reduced gain with a tighter
    /// settle requirement, for final-approach precision.
    ///
    /// Units: degrees
    SlowTurnToHeading(f64),

    /// Do nothing for a fixed duration, measured against the tick clock.
    Wait {
        duration_s: f64,
        /// Clock time at which the wait began, set at initialise.
        start_s: Option<f64>,
    },

    /// Move the elbow axis to a target position under its controller.
    MoveElbow { target: f64, timeout_s: f64 },

    /// Move the linear slide axis to a target position under its controller.
    MoveSlide { target: f64, timeout_s: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Primitive {
    /// A wait primitive, not yet started.
    pub fn wait(duration_s: f64) -> Self {
        Primitive::Wait {
            duration_s,
            start_s: None,
        }
    }

    /// True if this is the trailing settle wait.
    pub fn is_settle_wait(&self) -> bool {
        matches!(
            self,
            Primitive::Wait { duration_s, .. } if *duration_s == SETTLE_WAIT_S
        )
    }

    /// The resource this primitive needs exclusively.
    pub fn resources(&self) -> ResourceSet {
        match self {
            Primitive::Drive(_)
            | Primitive::Strafe(_)
            | Primitive::Turn(_)
            | Primitive::TurnToHeading(_)
            | Primitive::SlowTurnToHeading(_) => ResourceSet::DRIVETRAIN,
            Primitive::Wait { .. } => ResourceSet::NONE,
            Primitive::MoveElbow { .. } => ResourceSet::ELBOW,
            Primitive::MoveSlide { .. } => ResourceSet::SLIDE,
        }
    }

    pub(crate) fn initialize(&mut self, ctx: &mut CmdCtx) {
        let now_s = ctx.ports.clock.elapsed_seconds();

        match self {
            Primitive::Drive(d) => ctx.ports.drivetrain.drive(*d),
            Primitive::Strafe(d) => ctx.ports.drivetrain.strafe(*d),
            Primitive::Turn(d) => ctx.ports.drivetrain.turn(*d),
            Primitive::TurnToHeading(h) => ctx.ports.drivetrain.turn_to_heading(*h),
            Primitive::SlowTurnToHeading(h) => ctx.ports.drivetrain.slow_turn_to_heading(*h),
            Primitive::Wait { start_s, .. } => *start_s = Some(now_s),
            Primitive::MoveElbow { target, timeout_s } => {
                ctx.elbow_ctrl.set_target(*target, *timeout_s, now_s)
            }
            Primitive::MoveSlide { target, timeout_s } => {
                ctx.slide_ctrl.set_target(*target, *timeout_s, now_s)
            }
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut CmdCtx) {
        match self {
            // Drivetrain manoeuvres run in the port's own closed loop; the
            // core only polls for completion. Waits have nothing to do.
            Primitive::Drive(_)
            | Primitive::Strafe(_)
            | Primitive::Turn(_)
            | Primitive::TurnToHeading(_)
            | Primitive::SlowTurnToHeading(_)
            | Primitive::Wait { .. } => (),

            Primitive::MoveElbow { .. } => {
                let now_s = ctx.ports.clock.elapsed_seconds();
                ctx.elbow_ctrl.run_pid(&mut *ctx.ports.elbow, now_s);
            }
            Primitive::MoveSlide { .. } => {
                let now_s = ctx.ports.clock.elapsed_seconds();
                ctx.slide_ctrl.run_pid(&mut *ctx.ports.slide, now_s);
            }
        }
    }

    pub(crate) fn is_finished(&self, ctx: &CmdCtx) -> bool {
        match self {
            Primitive::Drive(_)
            | Primitive::Strafe(_)
            | Primitive::Turn(_)
            | Primitive::TurnToHeading(_)
            | Primitive::SlowTurnToHeading(_) => ctx.ports.drivetrain.motion_complete(),

            Primitive::Wait { duration_s, start_s } => match start_s {
                Some(t0) => ctx.ports.clock.elapsed_seconds() - t0 >= *duration_s,
                None => false,
            },

            Primitive::MoveElbow { .. } => ctx.elbow_ctrl.is_at_target(),
            Primitive::MoveSlide { .. } => ctx.slide_ctrl.is_at_target(),
        }
    }

    pub(crate) fn end(&mut self, ctx: &mut CmdCtx, _interrupted: bool) {
        match self {
            Primitive::Drive(_)
            | Primitive::Strafe(_)
            | Primitive::Turn(_)
            | Primitive::TurnToHeading(_)
            | Primitive::SlowTurnToHeading(_) => ctx.ports.drivetrain.stop(),

            Primitive::Wait { .. } => (),

            Primitive::MoveElbow { .. } => ctx.elbow_ctrl.stop(&mut *ctx.ports.elbow),
            Primitive::MoveSlide { .. } => ctx.slide_ctrl.stop(&mut *ctx.ports.slide),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ports::ActuatorPort;
    use crate::sim::SimRig;

    #[test]
    fn test_wait_measures_tick_clock() {
        let mut rig = SimRig::new();
        let mut wait = Primitive::wait(0.2);

        rig.with_ctx(|ctx| wait.initialize(ctx));
        assert!(!rig.with_ctx(|ctx| wait.is_finished(ctx)));

        // 0.2 s is four cycles at 20 Hz
        for _ in 0..4 {
            rig.step();
        }
        assert!(rig.with_ctx(|ctx| wait.is_finished(ctx)));
    }

    #[test]
    fn test_unstarted_wait_is_not_finished() {
        let mut rig = SimRig::new();
        let wait = Primitive::wait(0.0);

        // Never initialised: no start mark, so not finished even with zero
        // duration
        assert!(!rig.with_ctx(|ctx| wait.is_finished(ctx)));
    }

    #[test]
    fn test_arm_primitive_drives_controller() {
        let mut rig = SimRig::new();
        let mut cmd = Primitive::MoveElbow {
            target: 1500.0,
            timeout_s: 5.0,
        };

        rig.with_ctx(|ctx| cmd.initialize(ctx));

        for _ in 0..500 {
            let done = rig.with_ctx(|ctx| {
                cmd.execute(ctx);
                cmd.is_finished(ctx)
            });
            rig.step();
            if done {
                break;
            }
        }

        assert!(rig.with_ctx(|ctx| cmd.is_finished(ctx)));
        assert!((rig.elbow.current_position() - 1500.0).abs() < 100.0);
    }

    #[test]
    fn test_settle_wait_detection() {
        assert!(Primitive::wait(SETTLE_WAIT_S).is_settle_wait());
        assert!(!Primitive::wait(5.0).is_settle_wait());
        assert!(!Primitive::Drive(10.0).is_settle_wait());
    }
}
