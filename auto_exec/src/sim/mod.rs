//! Simulation models module
//!
//! In-memory implementations of the four hardware ports, good enough to run
//! the whole autonomous engine on a bench with no robot attached. The motion
//! models are deliberately crude - constant-rate kinematics, no slip, no
//! momentum - because the engine only ever polls completion predicates; the
//! fidelity that matters is *when* things finish, not where the robot really
//! ends up.
//!
//! Time is explicit: nothing here reads a wall clock. The harness advances
//! [`SimClock`] and steps the models by the same interval, which keeps every
//! test fully deterministic.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::Cell;

// Internal
use crate::arm_ctrl::{ArmCtrl, ArmParams};
use crate::motion::CmdCtx;
use crate::ports::{ActuatorPort, ClockPort, DrivetrainPort, Ports, SpikeSensorPort};
use crate::CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Straight-line and strafe speed of the simulated drivetrain.
///
/// Units: inches/second
const DRIVE_SPEED_INS: f64 = 20.0;

/// Turn rate of the simulated drivetrain.
///
/// Units: degrees/second
const TURN_RATE_DEGS: f64 = 120.0;

/// Turn rate for slow (reduced gain) heading turns.
///
/// Units: degrees/second
const SLOW_TURN_RATE_DEGS: f64 = 45.0;

/// Axis travel per unit power per second for the simulated actuators.
///
/// Units: encoder pulses/second at full power
const ACTUATOR_RATE_PULSES: f64 = 1200.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The manoeuvre currently running in the simulated drivetrain.
#[derive(Debug, Clone, Copy)]
enum Manoeuvre {
    Drive { remaining_in: f64, sign: f64 },
    Strafe { remaining_in: f64, sign: f64 },
    Turn { remaining_deg: f64, sign: f64, rate: f64 },
}

/// Simulated mecanum drivetrain.
#[derive(Debug, Default)]
pub struct SimDrivetrain {
    manoeuvre: Option<Manoeuvre>,

    forward_travel_in: f64,
    lateral_travel_in: f64,
    heading_deg: f64,

    manoeuvre_count: usize,
    stop_count: usize,
}

/// Simulated single arm axis with a hard stop at zero.
#[derive(Debug)]
pub struct SimActuator {
    position: f64,
    power: f64,
    jammed: bool,
    /// Forced limit-switch reading for fault-injection tests, otherwise the
    /// switch follows the hard stop.
    switch_override: Option<bool>,
}

/// Simulated spike-mark distance sensor pair with fixed readings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimSpikeSensors {
    pub near_blocked: bool,
    pub far_blocked: bool,
}

/// Settable monotonic clock.
#[derive(Debug, Default)]
pub struct SimClock {
    elapsed_s: Cell<f64>,
}

/// A complete simulated robot: every port plus a pair of arm controllers,
/// ready to hand to the scheduler as a [`CmdCtx`].
pub struct SimRig {
    pub drivetrain: SimDrivetrain,
    pub elbow: SimActuator,
    pub slide: SimActuator,
    pub spike_sensors: SimSpikeSensors,
    pub clock: SimClock,

    elbow_ctrl: ArmCtrl,
    slide_ctrl: ArmCtrl,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrivetrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the model by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let manoeuvre = match self.manoeuvre {
            Some(m) => m,
            None => return,
        };

        self.manoeuvre = match manoeuvre {
            Manoeuvre::Drive { remaining_in, sign } => {
                let travel = (DRIVE_SPEED_INS * dt_s).min(remaining_in);
                self.forward_travel_in += sign * travel;
                let remaining_in = remaining_in - travel;
                (remaining_in > 0.0).then(|| Manoeuvre::Drive { remaining_in, sign })
            }
            Manoeuvre::Strafe { remaining_in, sign } => {
                let travel = (DRIVE_SPEED_INS * dt_s).min(remaining_in);
                self.lateral_travel_in += sign * travel;
                let remaining_in = remaining_in - travel;
                (remaining_in > 0.0).then(|| Manoeuvre::Strafe { remaining_in, sign })
            }
            Manoeuvre::Turn {
                remaining_deg,
                sign,
                rate,
            } => {
                let travel = (rate * dt_s).min(remaining_deg);
                self.heading_deg += sign * travel;
                let remaining_deg = remaining_deg - travel;
                (remaining_deg > 0.0).then(|| Manoeuvre::Turn {
                    remaining_deg,
                    sign,
                    rate,
                })
            }
        };
    }

    pub fn forward_travel_in(&self) -> f64 {
        self.forward_travel_in
    }

    pub fn lateral_travel_in(&self) -> f64 {
        self.lateral_travel_in
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Number of manoeuvres started since construction.
    pub fn manoeuvre_count(&self) -> usize {
        self.manoeuvre_count
    }

    /// Number of times `stop` has been called.
    pub fn stop_count(&self) -> usize {
        self.stop_count
    }

    fn start(&mut self, manoeuvre: Manoeuvre) {
        self.manoeuvre = Some(manoeuvre);
        self.manoeuvre_count += 1;
    }

    fn start_heading_turn(&mut self, heading_deg: f64, rate: f64) {
        let delta = heading_deg - self.heading_deg;
        self.start(Manoeuvre::Turn {
            remaining_deg: delta.abs(),
            sign: delta.signum(),
            rate,
        });
    }
}

impl DrivetrainPort for SimDrivetrain {
    fn drive(&mut self, distance_in: f64) {
        self.start(Manoeuvre::Drive {
            remaining_in: distance_in.abs(),
            sign: distance_in.signum(),
        });
    }

    fn strafe(&mut self, distance_in: f64) {
        self.start(Manoeuvre::Strafe {
            remaining_in: distance_in.abs(),
            sign: distance_in.signum(),
        });
    }

    fn turn(&mut self, delta_heading_deg: f64) {
        self.start(Manoeuvre::Turn {
            remaining_deg: delta_heading_deg.abs(),
            sign: delta_heading_deg.signum(),
            rate: TURN_RATE_DEGS,
        });
    }

    fn turn_to_heading(&mut self, heading_deg: f64) {
        self.start_heading_turn(heading_deg, TURN_RATE_DEGS);
    }

    fn slow_turn_to_heading(&mut self, heading_deg: f64) {
        self.start_heading_turn(heading_deg, SLOW_TURN_RATE_DEGS);
    }

    fn motion_complete(&self) -> bool {
        self.manoeuvre.is_none()
    }

    fn stop(&mut self) {
        self.stop_count += 1;
        self.manoeuvre = None;
    }
}

impl SimActuator {
    /// An axis starting at the given position, free to move.
    pub fn new(position: f64) -> Self {
        Self {
            position,
            power: 0.0,
            jammed: false,
            switch_override: None,
        }
    }

    /// An axis which never moves regardless of power, for timeout tests.
    pub fn jammed(position: f64) -> Self {
        Self {
            jammed: true,
            ..Self::new(position)
        }
    }

    /// Advance the model by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        if self.jammed {
            return;
        }

        let applied = self.power.clamp(-1.0, 1.0);
        self.position += applied * ACTUATOR_RATE_PULSES * dt_s;
        if self.position < 0.0 {
            // The hard stop
            self.position = 0.0;
        }
    }

    /// Last commanded power.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Force the axis into an arbitrary state, including an inconsistent
    /// switch reading, for interlock tests.
    pub fn force_position(&mut self, position: f64, switch_engaged: bool) {
        self.position = position;
        self.switch_override = Some(switch_engaged);
    }
}

impl ActuatorPort for SimActuator {
    fn current_position(&self) -> f64 {
        self.position
    }

    fn set_power(&mut self, power: f64) {
        self.power = power;
    }

    fn limit_switch_engaged(&self) -> bool {
        match self.switch_override {
            Some(engaged) => engaged,
            None => self.position <= 0.0,
        }
    }

    fn reset_position(&mut self) {
        self.position = 0.0;
        self.switch_override = None;
    }
}

impl SpikeSensorPort for SimSpikeSensors {
    fn is_near_blocked(&self) -> bool {
        self.near_blocked
    }

    fn is_far_blocked(&self) -> bool {
        self.far_blocked
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Interior mutability so harnesses can hold shared
    /// references to the clock while the ports are borrowed.
    pub fn advance(&self, dt_s: f64) {
        self.elapsed_s.set(self.elapsed_s.get() + dt_s);
    }
}

impl ClockPort for SimClock {
    fn elapsed_seconds(&self) -> f64 {
        self.elapsed_s.get()
    }
}

impl SimRig {
    pub fn new() -> Self {
        Self::with_spike(false, false)
    }

    /// A rig whose spike sensors report the given readings.
    pub fn with_spike(near_blocked: bool, far_blocked: bool) -> Self {
        Self {
            drivetrain: SimDrivetrain::new(),
            elbow: SimActuator::new(0.0),
            slide: SimActuator::new(0.0),
            spike_sensors: SimSpikeSensors {
                near_blocked,
                far_blocked,
            },
            clock: SimClock::new(),
            elbow_ctrl: ArmCtrl::new(default_arm_params()),
            slide_ctrl: ArmCtrl::new(default_arm_params()),
        }
    }

    /// Borrow the rig as a port set.
    pub fn ports(&mut self) -> Ports {
        Ports {
            drivetrain: &mut self.drivetrain,
            elbow: &mut self.elbow,
            slide: &mut self.slide,
            spike_sensors: &self.spike_sensors,
            clock: &self.clock,
        }
    }

    /// Run a closure with a full command context over the rig's own arm
    /// controllers, for driving the scheduler directly in tests.
    pub fn with_ctx<R>(&mut self, f: impl FnOnce(&mut CmdCtx) -> R) -> R {
        let mut ports = Ports {
            drivetrain: &mut self.drivetrain,
            elbow: &mut self.elbow,
            slide: &mut self.slide,
            spike_sensors: &self.spike_sensors,
            clock: &self.clock,
        };
        let mut ctx = CmdCtx {
            ports: &mut ports,
            elbow_ctrl: &mut self.elbow_ctrl,
            slide_ctrl: &mut self.slide_ctrl,
        };
        f(&mut ctx)
    }

    /// Advance the whole rig one cycle: clock first, then the physical
    /// models.
    pub fn step(&mut self) {
        self.clock.advance(CYCLE_PERIOD_S);
        self.drivetrain.step(CYCLE_PERIOD_S);
        self.elbow.step(CYCLE_PERIOD_S);
        self.slide.step(CYCLE_PERIOD_S);
    }
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Workable arm parameters for bench runs and tests, roughly matching the
/// tuned files under `params/`.
pub fn default_arm_params() -> ArmParams {
    ArmParams {
        k_p: 0.01,
        k_i: 0.0,
        k_d: 0.0002,
        power_tolerance: 0.05,
        manual_speed_multiplier: 0.7,
        driving_position: 1000.0,
        level_position: 1600.0,
        scoring_position: 2700.0,
        intake_position: 30.0,
    }
}
