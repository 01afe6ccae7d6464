//! Route builder module
//!
//! Pure mapping from the match configuration and the resolved spike mark to
//! hand-tuned command sequences. Nothing here executes anything, and the same
//! inputs always produce an equivalent command tree.
//!
//! Every magnitude is in the drivetrain's native units (inches / degrees).
//! Magnitudes with a left/right or toward-alliance-wall meaning pass through
//! [`MatchConfig::flip`] exactly once; alliance-symmetric forward distances
//! do not. The numbers themselves are empirically tuned on the field.
//!
//! Every generated route ends with the settle wait, so downstream phase
//! transitions never fire on a motor that is still decelerating.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::arm_ctrl::{ArmParams, RETRACT_TARGET};
use crate::match_config::{MatchConfig, SpikeMark, StageSide};
use crate::motion::{Primitive, SETTLE_WAIT_S};
use crate::sched::Command;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How long arm moves may run before being forced complete.
const ELBOW_TIMEOUT_S: f64 = 2.5;
const SLIDE_TIMEOUT_S: f64 = 2.0;

/// Pause in the parking routes which gives our alliance partner room to
/// finish their own backdrop run before we drive through.
const PARTNER_WAIT_S: f64 = 5.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The fixed setup command scheduled at the start of the period: raise the
/// elbow to the driving position while approaching the spike-mark line.
pub fn auto_setup(elbow: &ArmParams) -> Command {
    Command::sequential(vec![
        Command::parallel(vec![
            leaf(Primitive::Drive(26.0)),
            leaf(Primitive::MoveElbow {
                target: elbow.driving_position,
                timeout_s: ELBOW_TIMEOUT_S,
            }),
        ]),
        settle(),
    ])
}

/// Drive from the spike-mark line to the detected mark and release the
/// purple game piece by driving over the mark, then square back up.
// TODO: Re-measure the spin-to-mark angles on the field, they were tuned on
// the practice tiles only.
pub fn place_purple(config: &MatchConfig, spike: SpikeMark) -> Command {
    let f = |v| config.flip(v);

    let mut cmds = match spike {
        SpikeMark::Near => vec![
            leaf(Primitive::Turn(f(50.0))),
            leaf(Primitive::Drive(4.0)),
            leaf(Primitive::Drive(-4.0)),
            leaf(Primitive::TurnToHeading(0.0)),
        ],
        SpikeMark::Middle => vec![leaf(Primitive::Drive(4.0)), leaf(Primitive::Drive(-4.0))],
        SpikeMark::Far => vec![
            leaf(Primitive::Turn(f(-50.0))),
            leaf(Primitive::Drive(4.0)),
            leaf(Primitive::Drive(-4.0)),
            leaf(Primitive::TurnToHeading(0.0)),
        ],
    };

    cmds.push(settle());
    Command::sequential(cmds)
}

/// The main decision tree: drive from where the purple was placed to the
/// next objective.
///
/// Evaluated in precedence order, first match wins:
/// 1. not placing yellow and not parking - just settle facing heading zero;
/// 2. near stage side, placing yellow - near-side route keyed by spike mark;
/// 3. far stage side, placing yellow - far-side route keyed by spike mark;
/// 4. far stage side, not placing but parking - parking route keyed by spike
///    mark.
/// A parking request from the near side has no tuned route and degrades to
/// rule 1.
pub fn drive_from_purple(
    config: &MatchConfig,
    spike: SpikeMark,
    elbow: &ArmParams,
    slide: &ArmParams,
) -> Command {
    if !config.place_yellow && !config.park_from_far {
        return face_backdrop_and_settle(config);
    }

    match (config.stage_side, config.place_yellow) {
        (StageSide::Near, true) => place_yellow_near_side(config, spike, elbow, slide),
        (StageSide::Far, true) => place_yellow_far_side(config, spike, elbow, slide),
        (StageSide::Far, false) => park_from_far_side(config, spike),
        // Near side without a yellow to place: nothing tuned, just settle
        (StageSide::Near, false) => face_backdrop_and_settle(config),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rule 1: turn to heading zero, settle there.
fn face_backdrop_and_settle(_config: &MatchConfig) -> Command {
    Command::sequential(vec![
        leaf(Primitive::TurnToHeading(0.0)),
        leaf(Primitive::SlowTurnToHeading(0.0)),
        settle(),
    ])
}

/// Rule 2: we start one tile from the backdrop.
fn place_yellow_near_side(
    config: &MatchConfig,
    spike: SpikeMark,
    elbow: &ArmParams,
    slide: &ArmParams,
) -> Command {
    let f = |v| config.flip(v);

    let mut cmds = match spike {
        SpikeMark::Near => vec![
            leaf(Primitive::Turn(f(90.0))),
            leaf(Primitive::Drive(25.0)),
            score_group(Primitive::Strafe(f(8.0)), elbow, slide),
        ],
        SpikeMark::Middle => vec![
            leaf(Primitive::Turn(f(90.0))),
            leaf(Primitive::Drive(32.0)),
            leaf(Primitive::Strafe(f(6.0))),
            score_group(Primitive::TurnToHeading(f(90.0)), elbow, slide),
        ],
        SpikeMark::Far => vec![
            leaf(Primitive::Drive(-4.0)),
            leaf(Primitive::Turn(f(180.0))),
            score_group(Primitive::Drive(26.0), elbow, slide),
        ],
    };

    cmds.push(retract_slide());
    cmds.push(settle());
    Command::sequential(cmds)
}

/// Rule 3: the long way round, under the truss to the backdrop.
// TODO: Re-measure the far-side strafe offsets, the middle-spike run clipped
// the truss leg on the last field test.
fn place_yellow_far_side(
    config: &MatchConfig,
    spike: SpikeMark,
    elbow: &ArmParams,
    slide: &ArmParams,
) -> Command {
    let f = |v| config.flip(v);

    let mut cmds = match spike {
        SpikeMark::Near => vec![
            leaf(Primitive::Strafe(f(24.0))),
            leaf(Primitive::TurnToHeading(f(90.0))),
            leaf(Primitive::Drive(80.0)),
            leaf(Primitive::Strafe(f(-25.0))),
            score_group(Primitive::TurnToHeading(f(90.0)), elbow, slide),
        ],
        SpikeMark::Middle => vec![
            leaf(Primitive::Strafe(f(15.0))),
            leaf(Primitive::SlowTurnToHeading(0.0)),
            leaf(Primitive::Drive(25.0)),
            leaf(Primitive::Turn(f(90.0))),
            leaf(Primitive::SlowTurnToHeading(f(90.0))),
            leaf(Primitive::Drive(90.0)),
            leaf(Primitive::Strafe(f(-23.0))),
            leaf(Primitive::SlowTurnToHeading(f(90.0))),
            score_group(Primitive::SlowTurnToHeading(f(90.0)), elbow, slide),
        ],
        SpikeMark::Far => vec![
            // Symmetric squeeze past the gate, no flip
            leaf(Primitive::Strafe(23.0)),
            leaf(Primitive::TurnToHeading(f(90.0))),
            leaf(Primitive::Drive(75.0)),
            leaf(Primitive::TurnToHeading(f(90.0))),
            leaf(Primitive::Strafe(f(-24.0))),
            score_group(Primitive::SlowTurnToHeading(f(90.0)), elbow, slide),
        ],
    };

    cmds.push(retract_slide());
    cmds.push(settle());
    Command::sequential(cmds)
}

/// Rule 4: park at the backdrop from the far side without scoring.
fn park_from_far_side(config: &MatchConfig, spike: SpikeMark) -> Command {
    let f = |v| config.flip(v);

    let lead_in = match spike {
        SpikeMark::Near => Some(leaf(Primitive::Strafe(f(20.0)))),
        SpikeMark::Middle => None,
        SpikeMark::Far => Some(leaf(Primitive::Strafe(f(-20.0)))),
    };

    // Middle spike leaves the robot further from the wall, so it tucks in
    // forwards rather than backing up
    let tuck_in = match spike {
        SpikeMark::Middle => leaf(Primitive::Drive(20.0)),
        _ => leaf(Primitive::Drive(-5.0)),
    };

    let mut cmds = Vec::new();
    cmds.extend(lead_in);
    cmds.extend(vec![
        leaf(Primitive::TurnToHeading(f(90.0))),
        leaf(Primitive::SlowTurnToHeading(f(90.0))),
        // Let our partner finish their run before crossing the field
        leaf(Primitive::wait(PARTNER_WAIT_S)),
        leaf(Primitive::Drive(85.0)),
        leaf(Primitive::TurnToHeading(f(0.0))),
        leaf(Primitive::SlowTurnToHeading(f(0.0))),
        tuck_in,
        settle(),
    ]);
    Command::sequential(cmds)
}

/// The final backdrop positioning primitive run in parallel with raising the
/// arm to score and extending the slide.
fn score_group(positioning: Primitive, elbow: &ArmParams, slide: &ArmParams) -> Command {
    Command::parallel(vec![
        leaf(positioning),
        Command::sequential(vec![
            leaf(Primitive::MoveElbow {
                target: elbow.scoring_position,
                timeout_s: ELBOW_TIMEOUT_S,
            }),
            leaf(Primitive::MoveSlide {
                target: slide.scoring_position,
                timeout_s: SLIDE_TIMEOUT_S,
            }),
        ]),
    ])
}

/// Pull the slide back onto its hard stop after scoring.
fn retract_slide() -> Command {
    leaf(Primitive::MoveSlide {
        target: RETRACT_TARGET,
        timeout_s: SLIDE_TIMEOUT_S,
    })
}

fn settle() -> Command {
    leaf(Primitive::wait(SETTLE_WAIT_S))
}

fn leaf(primitive: Primitive) -> Command {
    Command::leaf(primitive)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::match_config::Alliance;
    use crate::sched::CmdNode;
    use crate::sim::default_arm_params;

    fn all_configs() -> Vec<MatchConfig> {
        let mut configs = Vec::new();
        for alliance in [Alliance::Blue, Alliance::Red].iter() {
            for side in [StageSide::Near, StageSide::Far].iter() {
                for place_yellow in [false, true].iter() {
                    for park in [false, true].iter() {
                        configs.push(MatchConfig::new(*alliance, *place_yellow, *side, *park));
                    }
                }
            }
        }
        configs
    }

    fn all_spikes() -> [SpikeMark; 3] {
        [SpikeMark::Near, SpikeMark::Middle, SpikeMark::Far]
    }

    /// A route must be a non-empty sequence whose last child is the settle
    /// wait.
    fn assert_ends_with_settle(cmd: &Command) {
        match cmd.node() {
            CmdNode::Sequential { children, .. } => {
                assert!(!children.is_empty());
                match children.last().map(|c| c.node()) {
                    Some(CmdNode::Leaf(p)) => assert!(p.is_settle_wait()),
                    other => panic!("route does not end in a settle wait: {:?}", other),
                }
            }
            other => panic!("route is not a sequential group: {:?}", other),
        }
    }

    #[test]
    fn test_every_route_ends_with_settle_wait() {
        let arm = default_arm_params();
        for config in all_configs() {
            for spike in all_spikes().iter() {
                assert_ends_with_settle(&drive_from_purple(&config, *spike, &arm, &arm));
                assert_ends_with_settle(&place_purple(&config, *spike));
            }
        }
        assert_ends_with_settle(&auto_setup(&arm));
    }

    #[test]
    fn test_no_yellow_no_park_is_turn_and_settle() {
        let arm = default_arm_params();
        let config = MatchConfig::new(Alliance::Red, false, StageSide::Near, false);

        for spike in all_spikes().iter() {
            let route = drive_from_purple(&config, *spike, &arm, &arm);
            match route.node() {
                CmdNode::Sequential { children, .. } => {
                    // Two turn primitives plus the settle wait, regardless of
                    // stage side or spike mark
                    assert_eq!(children.len(), 3);
                    assert!(matches!(
                        children[0].node(),
                        CmdNode::Leaf(Primitive::TurnToHeading(h)) if *h == 0.0
                    ));
                    assert!(matches!(
                        children[1].node(),
                        CmdNode::Leaf(Primitive::SlowTurnToHeading(h)) if *h == 0.0
                    ));
                }
                other => panic!("unexpected route shape: {:?}", other),
            }
        }
    }

    #[test]
    fn test_parking_branch_distinct_from_placing_branch() {
        let arm = default_arm_params();
        let placing = MatchConfig::new(Alliance::Blue, true, StageSide::Far, false);
        let parking = MatchConfig::new(Alliance::Blue, false, StageSide::Far, true);

        let placing_route = drive_from_purple(&placing, SpikeMark::Middle, &arm, &arm);
        let parking_route = drive_from_purple(&parking, SpikeMark::Middle, &arm, &arm);

        assert_ne!(
            format!("{:?}", placing_route),
            format!("{:?}", parking_route)
        );
    }

    #[test]
    fn test_alliance_mirrors_lateral_magnitudes() {
        let arm = default_arm_params();
        let blue = MatchConfig::new(Alliance::Blue, true, StageSide::Near, false);
        let red = MatchConfig::new(Alliance::Red, true, StageSide::Near, false);

        let blue_route = drive_from_purple(&blue, SpikeMark::Near, &arm, &arm);
        let red_route = drive_from_purple(&red, SpikeMark::Near, &arm, &arm);

        // The first primitive of the near-side near-spike branch is the
        // alliance-flipped 90 degree spin
        let first_turn = |cmd: &Command| match cmd.node() {
            CmdNode::Sequential { children, .. } => match children[0].node() {
                CmdNode::Leaf(Primitive::Turn(d)) => *d,
                other => panic!("expected a turn, got {:?}", other),
            },
            other => panic!("expected a sequence, got {:?}", other),
        };

        assert_eq!(first_turn(&blue_route), 90.0);
        assert_eq!(first_turn(&red_route), -90.0);
    }

    #[test]
    fn test_spike_marks_select_distinct_branches() {
        let arm = default_arm_params();
        let config = MatchConfig::new(Alliance::Blue, true, StageSide::Far, false);

        let near = format!("{:?}", drive_from_purple(&config, SpikeMark::Near, &arm, &arm));
        let middle = format!(
            "{:?}",
            drive_from_purple(&config, SpikeMark::Middle, &arm, &arm)
        );
        let far = format!("{:?}", drive_from_purple(&config, SpikeMark::Far, &arm, &arm));

        assert_ne!(near, middle);
        assert_ne!(middle, far);
        assert_ne!(near, far);
    }

    #[test]
    fn test_near_side_park_degrades_to_turn_route() {
        let arm = default_arm_params();
        let config = MatchConfig::new(Alliance::Blue, false, StageSide::Near, true);

        let route = drive_from_purple(&config, SpikeMark::Middle, &arm, &arm);
        match route.node() {
            CmdNode::Sequential { children, .. } => assert_eq!(children.len(), 3),
            other => panic!("unexpected route shape: {:?}", other),
        }
    }
}
