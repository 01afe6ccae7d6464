//! Command scheduler module
//!
//! A cooperative executor for [`Command`] trees. The scheduler owns the active
//! commands, advances each exactly one step per [`Scheduler::tick`], and
//! enforces resource exclusivity: scheduling a command cancels any running
//! command which shares a resource, running its safe-shutdown hook before the
//! newcomer initialises.
//!
//! The scheduler treats commands opaquely through their lifecycle interface;
//! everything the commands actually do lives in [`crate::motion`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod command;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
pub use command::*;

use crate::motion::CmdCtx;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A set of resource tokens, one per physical subsystem.
///
/// At most one running command may hold a given token at any tick; this is
/// the only locking discipline in the system, since execution is
/// single-threaded and cooperative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceSet(u8);

/// The cooperative command executor.
#[derive(Default)]
pub struct Scheduler {
    /// Commands currently being run. The scheduler owns the trees; a command
    /// is dropped once it finishes or is cancelled.
    active: Vec<Command>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ResourceSet {
    /// The empty set - commands needing no exclusive hardware (waits).
    pub const NONE: ResourceSet = ResourceSet(0);

    /// The drivetrain as a whole.
    pub const DRIVETRAIN: ResourceSet = ResourceSet(1);

    /// The arm elbow axis.
    pub const ELBOW: ResourceSet = ResourceSet(1 << 1);

    /// The linear slide axis.
    pub const SLIDE: ResourceSet = ResourceSet(1 << 2);

    /// The union of two sets.
    pub fn union(self, other: ResourceSet) -> ResourceSet {
        ResourceSet(self.0 | other.0)
    }

    /// True if the two sets share any token.
    pub fn intersects(self, other: ResourceSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ResourceSet {
    type Output = ResourceSet;

    fn bitor(self, rhs: ResourceSet) -> ResourceSet {
        self.union(rhs)
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self { active: Vec::new() }
    }

    /// Register a command tree as active for its declared resources.
    ///
    /// Any running command sharing a resource is cancelled first, receiving
    /// its `end(interrupted = true)` shutdown hook synchronously - before the
    /// new command can initialise - so two commands can never drive the same
    /// subsystem within one tick.
    pub fn schedule(&mut self, cmd: Command, ctx: &mut CmdCtx) {
        let resources = cmd.resources();

        for active in self.active.iter_mut() {
            if active.resources().intersects(resources) {
                debug!("Cancelling command for resource conflict");
                active.end(ctx, true);
            }
        }
        self.active.retain(|c| !c.is_complete());

        self.active.push(cmd);
    }

    /// Advance every active command exactly one step.
    ///
    /// Uninitialised commands receive their `initialize` call; running
    /// commands receive exactly one `execute`; commands whose completion
    /// predicate holds receive `end(interrupted = false)` and are removed.
    pub fn tick(&mut self, ctx: &mut CmdCtx) {
        for cmd in self.active.iter_mut() {
            match cmd.status() {
                CmdStatus::Created => cmd.initialize(ctx),
                CmdStatus::Initialized | CmdStatus::Running => cmd.execute(ctx),
                CmdStatus::Finished | CmdStatus::Canceled => (),
            }

            if !cmd.is_complete() && cmd.is_finished(ctx) {
                cmd.end(ctx, false);
            }
        }

        self.active.retain(|c| !c.is_complete());
    }

    /// Cancel every active command, running the shutdown hooks.
    ///
    /// Idempotent: cancelling an empty scheduler, or one whose commands have
    /// already completed, is a no-op.
    pub fn cancel_all(&mut self, ctx: &mut CmdCtx) {
        for cmd in self.active.iter_mut() {
            cmd.end(ctx, true);
        }
        self.active.clear();
    }

    /// True when no command is active.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion::Primitive;
    use crate::sim::SimRig;

    #[test]
    fn test_resource_set_ops() {
        let drive_arm = ResourceSet::DRIVETRAIN | ResourceSet::ELBOW;

        assert!(drive_arm.intersects(ResourceSet::DRIVETRAIN));
        assert!(drive_arm.intersects(ResourceSet::ELBOW));
        assert!(!drive_arm.intersects(ResourceSet::SLIDE));
        assert!(!ResourceSet::NONE.intersects(drive_arm));
        assert!(ResourceSet::NONE.is_empty());
    }

    #[test]
    fn test_tick_runs_command_to_completion() {
        let mut rig = SimRig::new();
        let mut sched = Scheduler::new();

        rig.with_ctx(|ctx| sched.schedule(Command::leaf(Primitive::Drive(10.0)), ctx));
        assert!(!sched.is_idle());

        for _ in 0..100 {
            rig.with_ctx(|ctx| sched.tick(ctx));
            rig.step();
            if sched.is_idle() {
                break;
            }
        }

        assert!(sched.is_idle());
        assert!((rig.drivetrain.forward_travel_in() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_conflicting_schedule_cancels_before_init() {
        let mut rig = SimRig::new();
        let mut sched = Scheduler::new();

        rig.with_ctx(|ctx| sched.schedule(Command::leaf(Primitive::Drive(50.0)), ctx));
        rig.with_ctx(|ctx| sched.tick(ctx));
        rig.step();

        let stops_before = rig.drivetrain.stop_count();
        let starts_before = rig.drivetrain.manoeuvre_count();

        // Second command shares the drivetrain: the first must receive its
        // shutdown hook before the newcomer's initialize runs
        rig.with_ctx(|ctx| sched.schedule(Command::leaf(Primitive::Turn(90.0)), ctx));
        assert_eq!(rig.drivetrain.stop_count(), stops_before + 1);
        assert_eq!(rig.drivetrain.manoeuvre_count(), starts_before);
        assert_eq!(sched.active_count(), 1);

        rig.with_ctx(|ctx| sched.tick(ctx));
        assert_eq!(rig.drivetrain.manoeuvre_count(), starts_before + 1);
    }

    #[test]
    fn test_disjoint_resources_run_together() {
        let mut rig = SimRig::new();
        let mut sched = Scheduler::new();

        rig.with_ctx(|ctx| {
            sched.schedule(Command::leaf(Primitive::Drive(20.0)), ctx);
            sched.schedule(
                Command::leaf(Primitive::MoveElbow {
                    target: 1000.0,
                    timeout_s: 2.0,
                }),
                ctx,
            );
        });

        // No conflict: both stay active
        assert_eq!(sched.active_count(), 2);
    }

    #[test]
    fn test_cancel_all_is_idempotent() {
        let mut rig = SimRig::new();
        let mut sched = Scheduler::new();

        rig.with_ctx(|ctx| sched.schedule(Command::leaf(Primitive::Drive(10.0)), ctx));
        rig.with_ctx(|ctx| {
            sched.cancel_all(ctx);
            sched.cancel_all(ctx);
        });

        assert!(sched.is_idle());
    }
}
