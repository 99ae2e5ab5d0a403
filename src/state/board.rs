//! Board geometry and seed movement.
//!
//! The board is a cycle of 12 pits. Pits 0-5 belong to side zero and pits
//! 6-11 to side one. Sowing walks forward (increasing index), captures walk
//! backward.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Number of pits on the board.
pub const PIT_COUNT: usize = 12;

/// Number of pits on each side.
pub const PITS_PER_SIDE: usize = 6;

/// Seeds placed in every pit at the start of a game.
pub const INITIAL_SEEDS_PER_PIT: u8 = 4;

/// Seeds in play for the whole game (board plus both scores).
pub const TOTAL_SEEDS: u32 = PIT_COUNT as u32 * INITIAL_SEEDS_PER_PIT as u32;

/// One of the two fixed halves of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Zero,
    One,
}

impl Side {
    /// Pit indices owned by this side.
    pub fn pits(self) -> Range<usize> {
        match self {
            Self::Zero => 0..PITS_PER_SIDE,
            Self::One => PITS_PER_SIDE..PIT_COUNT,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    /// Check if a pit belongs to this side.
    pub fn owns(self, pit: usize) -> bool {
        self.pits().contains(&pit)
    }

    /// Side owning a pit, or `None` if the index is off the board.
    pub fn of_pit(pit: usize) -> Option<Self> {
        if Self::Zero.owns(pit) {
            Some(Self::Zero)
        } else if Self::One.owns(pit) {
            Some(Self::One)
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "player0"),
            Self::One => write!(f, "player1"),
        }
    }
}

/// Index of the pit after `pit`, wrapping 11 -> 0.
pub fn next_pit(pit: usize) -> usize {
    (pit + 1) % PIT_COUNT
}

/// Index of the pit before `pit`, wrapping 0 -> 11.
pub fn prev_pit(pit: usize) -> usize {
    (pit + PIT_COUNT - 1) % PIT_COUNT
}

/// Seed counts for the 12 pits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([u8; PIT_COUNT]);

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Starting position: every pit holds four seeds.
    pub fn new() -> Self {
        Self([INITIAL_SEEDS_PER_PIT; PIT_COUNT])
    }

    pub fn from_pits(pits: [u8; PIT_COUNT]) -> Self {
        Self(pits)
    }

    pub fn pits(&self) -> &[u8; PIT_COUNT] {
        &self.0
    }

    /// Seed count at a pit, `None` if off the board.
    pub fn seeds(&self, pit: usize) -> Option<u8> {
        self.0.get(pit).copied()
    }

    /// Seeds currently on the board.
    pub fn total(&self) -> u32 {
        self.0.iter().map(|&s| u32::from(s)).sum()
    }

    /// Seeds currently on one side.
    pub fn side_total(&self, side: Side) -> u32 {
        self.0[side.pits()].iter().map(|&s| u32::from(s)).sum()
    }

    /// Check if every pit on a side is empty.
    pub fn is_side_empty(&self, side: Side) -> bool {
        self.0[side.pits()].iter().all(|&s| s == 0)
    }

    /// Non-empty pits on a side, in index order.
    pub fn non_empty_pits(&self, side: Side) -> impl Iterator<Item = usize> + '_ {
        side.pits().filter(move |&pit| self.0[pit] > 0)
    }

    /// Lift every seed out of `from` and drop one into each following pit,
    /// never refilling `from` itself.
    ///
    /// Returns the landing pit (the last pit that received a seed), or `None`
    /// if `from` was empty or off the board. An empty pit leaves the board
    /// untouched.
    pub fn sow(&mut self, from: usize) -> Option<usize> {
        let seeds = *self.0.get(from)?;
        if seeds == 0 {
            return None;
        }

        self.0[from] = 0;
        let mut pit = from;
        for _ in 0..seeds {
            pit = next_pit(pit);
            if pit == from {
                pit = next_pit(pit);
            }
            self.0[pit] += 1;
        }

        Some(pit)
    }

    /// Take seeds from `landing` backward while each pit is on `victim`'s
    /// side and holds exactly 2 or 3 seeds. Captured pits are emptied.
    ///
    /// Returns the number of seeds captured.
    pub fn capture_from(&mut self, landing: usize, victim: Side) -> u32 {
        let mut captured = 0;
        let mut pit = landing;

        // At most one side's worth of pits can qualify.
        for _ in 0..PITS_PER_SIDE {
            if !victim.owns(pit) || !matches!(self.0[pit], 2 | 3) {
                break;
            }
            captured += u32::from(self.0[pit]);
            self.0[pit] = 0;
            pit = prev_pit(pit);
        }

        captured
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |pits: &[u8]| {
            pits.iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(
            f,
            "[{} | {}]",
            render(&self.0[Side::Zero.pits()]),
            render(&self.0[Side::One.pits()])
        )
    }
}
