//! Match configuration
//!
//! [`MatchConfig`] carries the discrete parameters chosen before the match
//! starts, plus the one value resolved at runtime: which spike mark the game
//! piece sits on. [`MatchConfig::flip`] is the single point where left/right
//! alliance symmetry is encoded - every alliance-sensitive magnitude in a
//! route passes through it exactly once.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which alliance the robot is playing for this match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alliance {
    Blue,
    Red,
}

/// Which of the two lateral start positions the robot occupies, relative to
/// the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageSide {
    /// Closer to the backdrop ("upstage" on the field diagram).
    Near,
    /// Further from the backdrop, the long way round under the truss.
    Far,
}

/// The three discrete floor positions the game piece can be detected on,
/// alliance-relative to the robot's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpikeMark {
    Near,
    Middle,
    Far,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All of the parameters for one autonomous run.
///
/// Everything except the spike mark is fixed at construction. The spike mark
/// is unknown until the phase machine has read the distance sensors, and is
/// assigned exactly once; route logic treats it as immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct MatchConfig {
    /// Which alliance we are on.
    pub alliance: Alliance,

    /// Whether we want to place the yellow game piece on the backdrop.
    pub place_yellow: bool,

    /// Which stage side we start on.
    pub stage_side: StageSide,

    /// Whether to park at the backdrop from the far side when not placing
    /// the yellow.
    pub park_from_far: bool,

    /// Which spike mark the game piece was detected on, set once at runtime.
    spike_mark: Option<SpikeMark>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MatchConfig {
    /// Create a configuration with the spike mark not yet resolved.
    pub fn new(
        alliance: Alliance,
        place_yellow: bool,
        stage_side: StageSide,
        park_from_far: bool,
    ) -> Self {
        Self {
            alliance,
            place_yellow,
            stage_side,
            park_from_far,
            spike_mark: None,
        }
    }

    /// Assign the resolved spike mark. Only the first assignment sticks.
    pub fn set_spike_mark(&mut self, mark: SpikeMark) {
        if let Some(existing) = self.spike_mark {
            warn!(
                "Spike mark already resolved to {:?}, ignoring {:?}",
                existing, mark
            );
            return;
        }
        self.spike_mark = Some(mark);
    }

    /// The resolved spike mark, or `None` before resolution.
    pub fn spike_mark(&self) -> Option<SpikeMark> {
        self.spike_mark
    }

    /// Mirror a lateral magnitude for the alliance.
    ///
    /// Blue routes are the hand-tuned reference; red is the mirror image, so
    /// lateral strafes and turn headings negate. The sign depends only on the
    /// alliance, never on stage side or spike mark.
    pub fn flip(&self, value: f64) -> f64 {
        match self.alliance {
            Alliance::Blue => value,
            Alliance::Red => -value,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flip_is_alliance_pure() {
        let blue = MatchConfig::new(Alliance::Blue, true, StageSide::Near, false);
        let red = MatchConfig::new(Alliance::Red, true, StageSide::Near, false);

        // Deterministic for repeated calls with the same alliance
        assert_eq!(blue.flip(12.5), blue.flip(12.5));
        assert_eq!(red.flip(12.5), red.flip(12.5));

        // The two alliances are exact mirrors of each other
        for x in [-90.0, -8.0, 0.0, 6.0, 25.0].iter() {
            assert_eq!(blue.flip(*x), -red.flip(*x));
        }
    }

    #[test]
    fn test_flip_ignores_side_and_mark() {
        let mut near = MatchConfig::new(Alliance::Red, true, StageSide::Near, false);
        let mut far = MatchConfig::new(Alliance::Red, false, StageSide::Far, true);
        near.set_spike_mark(SpikeMark::Near);
        far.set_spike_mark(SpikeMark::Far);

        assert_eq!(near.flip(20.0), far.flip(20.0));
    }

    #[test]
    fn test_spike_mark_set_once() {
        let mut config = MatchConfig::new(Alliance::Blue, true, StageSide::Far, false);
        assert_eq!(config.spike_mark(), None);

        config.set_spike_mark(SpikeMark::Middle);
        config.set_spike_mark(SpikeMark::Far);

        assert_eq!(config.spike_mark(), Some(SpikeMark::Middle));
    }
}
