//! Command tree implementation
//!
//! A command is a tagged tree: leaves are motion primitives, interior nodes
//! compose children sequentially or in parallel. One dispatch table (the
//! methods below) drives the whole lifecycle; there is no inheritance chain.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::ResourceSet;
use crate::motion::{CmdCtx, Primitive};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of a command node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdStatus {
    /// Constructed, not yet seen by the scheduler.
    Created,

    /// `initialize` has run; awaiting the first `execute`.
    Initialized,

    /// Being executed once per tick.
    Running,

    /// Completed normally.
    Finished,

    /// Cancelled before completion; the shutdown hook has run.
    Canceled,
}

/// The node shape of a command tree.
#[derive(Debug)]
pub enum CmdNode {
    /// A single motion primitive.
    Leaf(Primitive),

    /// Children run strictly in order; child i+1 is not initialised until
    /// child i has finished.
    Sequential {
        children: Vec<Command>,
        current: usize,
    },

    /// Children run together and the composite finishes when all have
    /// finished. Only used for children with disjoint resources.
    Parallel { children: Vec<Command> },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A schedulable command tree node.
#[derive(Debug)]
pub struct Command {
    status: CmdStatus,
    node: CmdNode,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Command {
    /// A leaf command from a single primitive.
    pub fn leaf(primitive: Primitive) -> Self {
        Self {
            status: CmdStatus::Created,
            node: CmdNode::Leaf(primitive),
        }
    }

    /// A sequential group of the given children.
    pub fn sequential(children: Vec<Command>) -> Self {
        Self {
            status: CmdStatus::Created,
            node: CmdNode::Sequential {
                children,
                current: 0,
            },
        }
    }

    /// A parallel group of the given children.
    pub fn parallel(children: Vec<Command>) -> Self {
        Self {
            status: CmdStatus::Created,
            node: CmdNode::Parallel { children },
        }
    }

    pub fn status(&self) -> CmdStatus {
        self.status
    }

    pub fn node(&self) -> &CmdNode {
        &self.node
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, CmdStatus::Finished | CmdStatus::Canceled)
    }

    /// The union of every resource this tree needs.
    pub fn resources(&self) -> ResourceSet {
        match &self.node {
            CmdNode::Leaf(p) => p.resources(),
            CmdNode::Sequential { children, .. } | CmdNode::Parallel { children } => children
                .iter()
                .fold(ResourceSet::NONE, |acc, c| acc.union(c.resources())),
        }
    }

    /// First step of the lifecycle. For groups this initialises only what
    /// must start now: the first sequential child, or every parallel child.
    pub(crate) fn initialize(&mut self, ctx: &mut CmdCtx) {
        match &mut self.node {
            CmdNode::Leaf(p) => p.initialize(ctx),
            CmdNode::Sequential { children, current } => {
                *current = 0;
                if let Some(child) = children.first_mut() {
                    child.initialize(ctx);
                }
            }
            CmdNode::Parallel { children } => {
                for child in children.iter_mut() {
                    child.initialize(ctx);
                }
            }
        }
        self.status = CmdStatus::Initialized;
    }

    /// One step of execution. Called at most once per scheduler tick.
    pub(crate) fn execute(&mut self, ctx: &mut CmdCtx) {
        self.status = CmdStatus::Running;

        match &mut self.node {
            CmdNode::Leaf(p) => p.execute(ctx),
            CmdNode::Sequential { children, current } => {
                if *current >= children.len() {
                    return;
                }

                if children[*current].is_finished(ctx) {
                    children[*current].end(ctx, false);
                    *current += 1;
                    if let Some(next) = children.get_mut(*current) {
                        next.initialize(ctx);
                    }
                } else {
                    children[*current].execute(ctx);
                }
            }
            CmdNode::Parallel { children } => {
                for child in children.iter_mut() {
                    if child.is_complete() {
                        continue;
                    }
                    if child.is_finished(ctx) {
                        child.end(ctx, false);
                    } else {
                        child.execute(ctx);
                    }
                }
            }
        }
    }

    /// The completion predicate polled by the scheduler.
    pub(crate) fn is_finished(&self, ctx: &CmdCtx) -> bool {
        match &self.node {
            CmdNode::Leaf(p) => p.is_finished(ctx),
            CmdNode::Sequential { children, current } => *current >= children.len(),
            CmdNode::Parallel { children } => children.iter().all(|c| {
                // A child which has been ended is done; one still running is
                // queried directly so a group can finish on the tick its last
                // child settles.
                c.is_complete() || c.is_finished(ctx)
            }),
        }
    }

    /// Shutdown hook. Safe to call repeatedly: a finished or cancelled node
    /// is left untouched.
    pub(crate) fn end(&mut self, ctx: &mut CmdCtx, interrupted: bool) {
        if self.is_complete() {
            return;
        }

        match &mut self.node {
            CmdNode::Leaf(p) => p.end(ctx, interrupted),
            CmdNode::Sequential { children, current } => {
                if let Some(child) = children.get_mut(*current) {
                    child.end(ctx, interrupted);
                }
            }
            CmdNode::Parallel { children } => {
                for child in children.iter_mut() {
                    child.end(ctx, interrupted);
                }
            }
        }

        self.status = if interrupted {
            CmdStatus::Canceled
        } else {
            CmdStatus::Finished
        };
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ports::ClockPort;
    use crate::sim::SimRig;

    #[test]
    fn test_sequential_runs_children_in_order() {
        let mut rig = SimRig::new();
        let mut cmd = Command::sequential(vec![
            Command::leaf(Primitive::Drive(10.0)),
            Command::leaf(Primitive::Turn(90.0)),
        ]);

        rig.with_ctx(|ctx| cmd.initialize(ctx));
        // Only the first child starts a manoeuvre at initialise
        assert_eq!(rig.drivetrain.manoeuvre_count(), 1);

        let mut ticks = 0;
        while ticks < 200 {
            let done = rig.with_ctx(|ctx| {
                cmd.execute(ctx);
                cmd.is_finished(ctx)
            });
            rig.step();
            ticks += 1;
            if done {
                break;
            }
        }

        assert!(ticks < 200, "sequential group never finished");
        assert_eq!(rig.drivetrain.manoeuvre_count(), 2);
        assert!((rig.drivetrain.forward_travel_in() - 10.0).abs() < 1e-9);
        assert!((rig.drivetrain.heading_deg() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_finishes_when_all_children_finish() {
        let mut rig = SimRig::new();
        // Two waits of different lengths: AND semantics mean the group runs
        // until the longer one elapses
        let mut cmd = Command::parallel(vec![
            Command::leaf(Primitive::wait(0.1)),
            Command::leaf(Primitive::wait(0.5)),
        ]);

        rig.with_ctx(|ctx| cmd.initialize(ctx));

        let mut elapsed_at_finish = None;
        for _ in 0..100 {
            let done = rig.with_ctx(|ctx| {
                cmd.execute(ctx);
                cmd.is_finished(ctx)
            });
            if done {
                elapsed_at_finish = Some(rig.clock.elapsed_seconds());
                break;
            }
            rig.step();
        }

        let t = elapsed_at_finish.expect("parallel group never finished");
        assert!(t >= 0.5);
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut rig = SimRig::new();
        let mut cmd = Command::leaf(Primitive::Drive(10.0));

        rig.with_ctx(|ctx| {
            cmd.initialize(ctx);
            cmd.end(ctx, true);
        });
        let stops = rig.drivetrain.stop_count();

        // A second cancellation is a no-op
        rig.with_ctx(|ctx| cmd.end(ctx, true));
        assert_eq!(rig.drivetrain.stop_count(), stops);
        assert_eq!(cmd.status(), CmdStatus::Canceled);
    }

    #[test]
    fn test_resources_union_over_tree() {
        use crate::sched::ResourceSet;

        let cmd = Command::sequential(vec![
            Command::leaf(Primitive::Drive(5.0)),
            Command::parallel(vec![
                Command::leaf(Primitive::MoveElbow {
                    target: 1000.0,
                    timeout_s: 1.0,
                }),
                Command::leaf(Primitive::MoveSlide {
                    target: 500.0,
                    timeout_s: 1.0,
                }),
            ]),
            Command::leaf(Primitive::wait(0.25)),
        ]);

        let r = cmd.resources();
        assert!(r.intersects(ResourceSet::DRIVETRAIN));
        assert!(r.intersects(ResourceSet::ELBOW));
        assert!(r.intersects(ResourceSet::SLIDE));
    }
}
