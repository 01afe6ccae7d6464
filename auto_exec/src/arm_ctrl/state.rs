//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::{ArmParams, PidController, RETRACT_POWER, RETRACT_TARGET};
use crate::ports::ActuatorPort;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode the axis controller is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArmMode {
    /// Open-loop power applied directly from operator input.
    Manual,

    /// The control law is armed and driving towards the target under a
    /// deadline.
    MovingToTarget,

    /// The axis has converged, hit the interlock, or run out its deadline.
    AtTarget,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Closed-loop controller for one arm axis.
pub struct ArmCtrl {
    params: ArmParams,

    pid: PidController,

    mode: ArmMode,

    /// Target position in encoder pulses.
    target: f64,

    /// Absolute clock time at which the current move is forced complete, or
    /// `None` if no deadline is pending.
    deadline_s: Option<f64>,

    /// Last power commanded to the port, kept for reports.
    last_power: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCtrl {
    pub fn new(params: ArmParams) -> Self {
        let pid = PidController::new(params.k_p, params.k_i, params.k_d);
        Self {
            params,
            pid,
            mode: ArmMode::Manual,
            target: 0.0,
            deadline_s: None,
            last_power: 0.0,
        }
    }

    /// Set the target for the PID controller, arming the control law.
    ///
    /// The timeout guarantees the move completes even if the physical
    /// convergence criterion is never met, so a jammed axis cannot stall the
    /// phase machine.
    pub fn set_target(&mut self, target: f64, timeout_s: f64, now_s: f64) {
        debug!("Arm target {:.0} with {:.2} s timeout", target, timeout_s);
        self.target = target;
        self.mode = ArmMode::MovingToTarget;
        self.deadline_s = if timeout_s > 0.0 {
            Some(now_s + timeout_s)
        } else {
            None
        };
        self.pid.reset();
    }

    /// Apply open-loop power directly, forcing manual mode.
    ///
    /// Requesting downward motion while the limit switch is engaged stops the
    /// motor and re-zeroes the position reference instead - the physical hard
    /// stop defines the zero position.
    pub fn move_manually(&mut self, power: f64, port: &mut dyn ActuatorPort) {
        self.mode = ArmMode::Manual;

        if power < 0.0 && port.limit_switch_engaged() {
            self.apply_power(0.0, port);
            port.reset_position();
            return;
        }

        self.apply_power(power * self.params.manual_speed_multiplier, port);
    }

    /// Evaluate the control law for one tick.
    ///
    /// Does nothing outside [`ArmMode::MovingToTarget`].
    pub fn run_pid(&mut self, port: &mut dyn ActuatorPort, now_s: f64) {
        if self.mode != ArmMode::MovingToTarget {
            return;
        }

        // Retract-to-hard-stop target: constant full negative power until the
        // switch engages or the deadline runs out, whichever comes first.
        if self.target == RETRACT_TARGET {
            if port.limit_switch_engaged() || self.deadline_passed(now_s) {
                self.apply_power(0.0, port);
                if port.limit_switch_engaged() {
                    port.reset_position();
                }
                self.finish_move();
            } else {
                self.apply_power(RETRACT_POWER, port);
            }
            return;
        }

        // Over-travel guard, independent of the PID law: already past the
        // target in the limiting direction with the switch engaged.
        if self.target < port.current_position() && port.limit_switch_engaged() {
            self.apply_power(0.0, port);
            port.reset_position();
            self.finish_move();
            return;
        }

        let error = self.target - port.current_position();
        let power = self.pid.get(error, now_s);
        self.apply_power(power, port);

        // A near-zero commanded correction means we've converged; the
        // deadline forces completion regardless.
        if power.abs() <= self.params.power_tolerance || self.deadline_passed(now_s) {
            self.apply_power(0.0, port);
            self.finish_move();
        }
    }

    /// Zero the axis power without changing mode.
    pub fn stop(&mut self, port: &mut dyn ActuatorPort) {
        self.apply_power(0.0, port);
    }

    /// The sole completion predicate exposed to commands built on this
    /// controller.
    pub fn is_at_target(&self) -> bool {
        self.mode == ArmMode::AtTarget
    }

    pub fn mode(&self) -> ArmMode {
        self.mode
    }

    pub fn last_power(&self) -> f64 {
        self.last_power
    }

    pub fn params(&self) -> &ArmParams {
        &self.params
    }

    fn apply_power(&mut self, power: f64, port: &mut dyn ActuatorPort) {
        self.last_power = power;
        port.set_power(power);
    }

    fn finish_move(&mut self) {
        self.mode = ArmMode::AtTarget;
        self.deadline_s = None;
    }

    fn deadline_passed(&self, now_s: f64) -> bool {
        match self.deadline_s {
            Some(d) => now_s >= d,
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimActuator;

    fn test_params() -> ArmParams {
        ArmParams {
            k_p: 0.01,
            k_i: 0.0,
            k_d: 0.0,
            power_tolerance: 0.05,
            manual_speed_multiplier: 0.7,
            driving_position: 1000.0,
            level_position: 1600.0,
            scoring_position: 2700.0,
            intake_position: 30.0,
        }
    }

    #[test]
    fn test_converges_to_target() {
        let mut ctrl = ArmCtrl::new(test_params());
        let mut axis = SimActuator::new(500.0);

        ctrl.set_target(2000.0, 5.0, 0.0);
        assert!(!ctrl.is_at_target());

        let mut now = 0.0;
        for _ in 0..2000 {
            ctrl.run_pid(&mut axis, now);
            axis.step(0.05);
            now += 0.05;
            if ctrl.is_at_target() {
                break;
            }
        }

        assert!(ctrl.is_at_target());
        // Converged, not timed out: position must be near the target
        assert!((axis.current_position() - 2000.0).abs() < 50.0);
        assert_eq!(axis.power(), 0.0);
    }

    #[test]
    fn test_timeout_forces_at_target() {
        let mut ctrl = ArmCtrl::new(test_params());
        // Axis that cannot move: jammed
        let mut axis = SimActuator::jammed(500.0);

        ctrl.set_target(2000.0, 1.0, 0.0);

        let mut now = 0.0;
        while now < 1.5 {
            ctrl.run_pid(&mut axis, now);
            now += 0.05;
        }

        // Convergence never happened but the deadline forces completion
        assert!(ctrl.is_at_target());
        assert_eq!(axis.power(), 0.0);
    }

    #[test]
    fn test_retract_sentinel_stops_on_limit_switch() {
        let mut ctrl = ArmCtrl::new(test_params());
        let mut axis = SimActuator::new(400.0);

        ctrl.set_target(RETRACT_TARGET, 3.0, 0.0);

        let mut now = 0.0;
        for _ in 0..1000 {
            ctrl.run_pid(&mut axis, now);
            axis.step(0.05);
            now += 0.05;
            if ctrl.is_at_target() {
                break;
            }
            // While still retracting, full negative power is applied
            assert_eq!(axis.power(), RETRACT_POWER);
        }

        assert!(ctrl.is_at_target());
        assert!(axis.limit_switch_engaged());
        // Hitting the hard stop re-zeroes the reference
        assert_eq!(axis.current_position(), 0.0);
    }

    #[test]
    fn test_limit_interlock_blocks_downward_power() {
        let mut ctrl = ArmCtrl::new(test_params());
        let mut axis = SimActuator::new(0.0);
        assert!(axis.limit_switch_engaged());

        // Manual downward request against the engaged switch is forced to zero
        ctrl.move_manually(-0.5, &mut axis);
        assert_eq!(axis.power(), 0.0);

        // Closed-loop move below the current position with the switch engaged
        // trips the over-travel guard rather than driving into the stop
        axis.force_position(50.0, true);
        ctrl.set_target(10.0, 2.0, 0.0);
        ctrl.run_pid(&mut axis, 0.05);
        assert!(ctrl.is_at_target());
        assert!(axis.power() >= 0.0);
    }

    #[test]
    fn test_upward_manual_power_scaled() {
        let mut ctrl = ArmCtrl::new(test_params());
        let mut axis = SimActuator::new(0.0);

        ctrl.move_manually(1.0, &mut axis);
        assert_eq!(axis.power(), 0.7);
        assert_eq!(ctrl.mode(), ArmMode::Manual);
    }
}
