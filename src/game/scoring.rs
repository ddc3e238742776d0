//! Point tally and the win threshold

use super::Side;

/// First member to reach this many points wins
pub const WIN_SCORE: u32 = 5;

/// Result of awarding a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Play continues with a new serve
    Continue,
    /// The scorer reached the threshold
    Won(Side),
}

/// Per-member scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub left: u32,
    pub right: u32,
}

impl Scoreboard {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Add one point for `scorer` and report whether that ended the match
    pub fn award(&mut self, scorer: Side) -> ScoreOutcome {
        let score = match scorer {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        *score += 1;

        if *score >= WIN_SCORE {
            ScoreOutcome::Won(scorer)
        } else {
            ScoreOutcome::Continue
        }
    }
}
