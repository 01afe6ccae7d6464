//! # Autonomous manager
//!
//! Top level controller for the autonomous period. Owns the scheduler, the
//! arm controllers and the match configuration, and walks the phase machine
//! which decides what to schedule next.
//!
//! The phase machine only advances when the scheduler has drained, so a
//! phase transition is always observed with the drivetrain and arm at rest
//! (modulo the settle wait each route ends with). Exactly three commands are
//! scheduled over a full run: the setup move, the purple placement and the
//! main route. The later phases exist to label where the main route has got
//! to and schedule nothing themselves.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::AutoCtrlParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::Serialize;

// Internal
use crate::arm_ctrl::ArmCtrl;
use crate::match_config::{MatchConfig, SpikeMark};
use crate::motion::CmdCtx;
use crate::ports::Ports;
use crate::route;
use crate::sched::{Command, Scheduler};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of the autonomous period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoPhase {
    /// Driving from the start wall to the spike-mark line.
    MovingToSpikeMarks,

    /// Releasing the purple game piece on the detected spike mark.
    PlacingPurple,

    /// Driving towards the backdrop, scoring or parking at the end of the
    /// route as configured.
    MovingToBackdrop,

    /// The backdrop approach has finished and the yellow has been placed.
    MovingToPlaceYellow,

    /// The parking route has finished and the robot is squared up.
    TurningCorrectDirection,

    /// Nothing left to do.
    Idle,
}

impl std::fmt::Display for AutoPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The autonomous controller.
pub struct AutoCtrl {
    params: AutoCtrlParams,

    config: MatchConfig,

    sched: Scheduler,

    elbow_ctrl: ArmCtrl,

    slide_ctrl: ArmCtrl,

    phase: AutoPhase,

    /// Number of commands scheduled so far this run.
    commands_scheduled: u32,
}

/// End-of-run summary, written into the session directory.
#[derive(Debug, Clone, Serialize)]
pub struct AutoReport {
    pub config: MatchConfig,

    pub final_phase: AutoPhase,

    pub commands_scheduled: u32,

    pub completed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AutoCtrl {
    pub fn new(params: AutoCtrlParams, config: MatchConfig) -> Self {
        let elbow_ctrl = ArmCtrl::new(params.elbow.clone());
        let slide_ctrl = ArmCtrl::new(params.slide.clone());

        Self {
            params,
            config,
            sched: Scheduler::new(),
            elbow_ctrl,
            slide_ctrl,
            phase: AutoPhase::MovingToSpikeMarks,
            commands_scheduled: 0,
        }
    }

    /// Begin the autonomous period by scheduling the setup move.
    pub fn start(&mut self, ports: &mut Ports) {
        info!("Autonomous period started ({:?})", self.config.alliance);

        self.phase = AutoPhase::MovingToSpikeMarks;

        let cmd = route::auto_setup(&self.params.elbow);
        let mut ctx = CmdCtx {
            ports,
            elbow_ctrl: &mut self.elbow_ctrl,
            slide_ctrl: &mut self.slide_ctrl,
        };
        self.sched.schedule(cmd, &mut ctx);
        self.commands_scheduled += 1;
    }

    /// Run one control cycle: advance the phase machine if the scheduler has
    /// drained, then tick the scheduler.
    pub fn run(&mut self, ports: &mut Ports) {
        if self.sched.is_idle() {
            self.advance_phase(ports);
        }

        let mut ctx = CmdCtx {
            ports,
            elbow_ctrl: &mut self.elbow_ctrl,
            slide_ctrl: &mut self.slide_ctrl,
        };
        self.sched.tick(&mut ctx);
    }

    /// Cancel everything in flight and go idle. Used when the period clock
    /// runs out.
    pub fn abort(&mut self, ports: &mut Ports) {
        info!("Autonomous run aborted in phase {}", self.phase);

        let mut ctx = CmdCtx {
            ports,
            elbow_ctrl: &mut self.elbow_ctrl,
            slide_ctrl: &mut self.slide_ctrl,
        };
        self.sched.cancel_all(&mut ctx);
        self.phase = AutoPhase::Idle;
    }

    /// True once the phase machine has reached idle and nothing is left in
    /// the scheduler.
    pub fn is_complete(&self) -> bool {
        self.phase == AutoPhase::Idle && self.sched.is_idle()
    }

    pub fn current_phase(&self) -> AutoPhase {
        self.phase
    }

    pub fn resolved_spike_mark(&self) -> Option<SpikeMark> {
        self.config.spike_mark()
    }

    pub fn report(&self) -> AutoReport {
        AutoReport {
            config: self.config.clone(),
            final_phase: self.phase,
            commands_scheduled: self.commands_scheduled,
            completed: self.is_complete(),
        }
    }

    /// Take the transition out of the current phase, scheduling the next
    /// command where one exists.
    fn advance_phase(&mut self, ports: &mut Ports) {
        let next = match self.phase {
            AutoPhase::MovingToSpikeMarks => {
                let spike = resolve_spike_mark(ports);
                self.config.set_spike_mark(spike);
                info!("Spike mark resolved: {:?}", spike);

                self.schedule(route::place_purple(&self.config, spike), ports);
                AutoPhase::PlacingPurple
            }
            AutoPhase::PlacingPurple => {
                // The resolved mark is set exactly once above
                let spike = self
                    .config
                    .spike_mark()
                    .unwrap_or(SpikeMark::Middle);

                let cmd = route::drive_from_purple(
                    &self.config,
                    spike,
                    &self.params.elbow,
                    &self.params.slide,
                );
                self.schedule(cmd, ports);

                if self.config.place_yellow || self.config.park_from_far {
                    AutoPhase::MovingToBackdrop
                } else {
                    // Nothing beyond squaring up, which is already in flight
                    AutoPhase::Idle
                }
            }
            AutoPhase::MovingToBackdrop => {
                if self.config.place_yellow {
                    AutoPhase::MovingToPlaceYellow
                } else {
                    AutoPhase::TurningCorrectDirection
                }
            }
            AutoPhase::MovingToPlaceYellow => AutoPhase::Idle,
            AutoPhase::TurningCorrectDirection => AutoPhase::Idle,
            AutoPhase::Idle => AutoPhase::Idle,
        };

        if next != self.phase {
            info!("Phase transition: {} -> {}", self.phase, next);
            self.phase = next;
        }
    }

    fn schedule(&mut self, cmd: Command, ports: &mut Ports) {
        let mut ctx = CmdCtx {
            ports,
            elbow_ctrl: &mut self.elbow_ctrl,
            slide_ctrl: &mut self.slide_ctrl,
        };
        self.sched.schedule(cmd, &mut ctx);
        self.commands_scheduled += 1;
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Map the spike sensor readings to a mark, defaulting to the middle when
/// neither sensor sees the game element.
fn resolve_spike_mark(ports: &Ports) -> SpikeMark {
    if ports.spike_sensors.is_near_blocked() {
        SpikeMark::Near
    } else if ports.spike_sensors.is_far_blocked() {
        SpikeMark::Far
    } else {
        SpikeMark::Middle
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::match_config::{Alliance, StageSide};
    use crate::ports::{ActuatorPort, DrivetrainPort};
    use crate::sim::{default_arm_params, SimRig};

    fn test_params() -> AutoCtrlParams {
        let mut slide = default_arm_params();
        slide.scoring_position = 1800.0;
        AutoCtrlParams {
            elbow: default_arm_params(),
            slide,
        }
    }

    /// Drive the controller against the rig until it reports completion,
    /// returning the number of cycles taken.
    fn run_to_completion(auto: &mut AutoCtrl, rig: &mut SimRig, max_cycles: usize) -> usize {
        {
            let mut ports = rig.ports();
            auto.start(&mut ports);
        }

        for cycle in 0..max_cycles {
            rig.step();
            let mut ports = rig.ports();
            auto.run(&mut ports);

            if auto.is_complete() {
                return cycle;
            }
        }

        panic!(
            "run stuck in phase {:?} after {} cycles",
            auto.current_phase(),
            max_cycles
        );
    }

    #[test]
    fn test_full_scoring_run() {
        let config = MatchConfig::new(Alliance::Blue, true, StageSide::Near, false);
        let mut auto = AutoCtrl::new(test_params(), config);
        let mut rig = SimRig::with_spike(true, false);

        run_to_completion(&mut auto, &mut rig, 1200);

        assert_eq!(auto.resolved_spike_mark(), Some(SpikeMark::Near));
        assert_eq!(auto.current_phase(), AutoPhase::Idle);

        let report = auto.report();
        assert!(report.completed);
        assert_eq!(report.commands_scheduled, 3);

        // The elbow settled at the scoring position and the slide came back
        // onto its hard stop
        assert!((rig.elbow.current_position() - 2700.0).abs() < 60.0);
        assert!(rig.slide.current_position() < 30.0);
        assert!(rig.drivetrain.motion_complete());
    }

    #[test]
    fn test_no_yellow_no_park_goes_idle_after_purple() {
        let config = MatchConfig::new(Alliance::Red, false, StageSide::Near, false);
        let mut auto = AutoCtrl::new(test_params(), config);
        let mut rig = SimRig::new();

        run_to_completion(&mut auto, &mut rig, 1200);

        assert_eq!(auto.resolved_spike_mark(), Some(SpikeMark::Middle));
        assert_eq!(auto.report().commands_scheduled, 3);

        // The final route only squares the robot up towards heading zero
        assert!(rig.drivetrain.heading_deg().abs() < 1.0);
    }

    #[test]
    fn test_parking_run_crosses_the_field() {
        let config = MatchConfig::new(Alliance::Blue, false, StageSide::Far, true);
        let mut auto = AutoCtrl::new(test_params(), config);
        let mut rig = SimRig::with_spike(false, true);

        let cycles = run_to_completion(&mut auto, &mut rig, 1200);

        assert_eq!(auto.resolved_spike_mark(), Some(SpikeMark::Far));
        // The parking route holds a deliberate pause for the alliance
        // partner, so the run cannot have been quick
        assert!(cycles as f64 * crate::CYCLE_PERIOD_S > 5.0);
        assert!(rig.drivetrain.forward_travel_in() > 50.0);
    }

    #[test]
    fn test_abort_goes_idle_and_stops_everything() {
        let config = MatchConfig::new(Alliance::Blue, true, StageSide::Far, false);
        let mut auto = AutoCtrl::new(test_params(), config);
        let mut rig = SimRig::new();

        {
            let mut ports = rig.ports();
            auto.start(&mut ports);
        }
        for _ in 0..20 {
            rig.step();
            let mut ports = rig.ports();
            auto.run(&mut ports);
        }
        assert!(!auto.is_complete());

        {
            let mut ports = rig.ports();
            auto.abort(&mut ports);
        }
        assert!(auto.is_complete());
        assert!(rig.drivetrain.motion_complete());
    }

    #[test]
    fn test_spike_mark_resolution_precedence() {
        let mut rig = SimRig::with_spike(true, true);
        assert_eq!(resolve_spike_mark(&rig.ports()), SpikeMark::Near);

        let mut rig = SimRig::with_spike(false, false);
        assert_eq!(resolve_spike_mark(&rig.ports()), SpikeMark::Middle);
    }
}
