//! Game state and the move rules.
//!
//! A [`Game`] is the persisted record for one pair of players: both names,
//! the board, the score and whose turn it is. It changes only through
//! [`Game::apply_move`] and [`Game::surrender`]. Both are transactional:
//! on error the input game is untouched.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::{Board, Side, PIT_COUNT, TOTAL_SEEDS};

/// A player wins once their score passes this (more than half the seeds).
pub const WINNING_SCORE_THRESHOLD: u32 = TOTAL_SEEDS / 2;

/// Turn indicator.
///
/// Persisted as a number: 0 and 1 are "to move", 2 and 3 are terminal wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TurnState {
    #[default]
    Player0ToMove,
    Player1ToMove,
    Player0Won,
    Player1Won,
}

impl TurnState {
    pub fn to_move(side: Side) -> Self {
        match side {
            Side::Zero => Self::Player0ToMove,
            Side::One => Self::Player1ToMove,
        }
    }

    pub fn won(side: Side) -> Self {
        match side {
            Side::Zero => Self::Player0Won,
            Side::One => Self::Player1Won,
        }
    }

    /// Side whose turn it is, `None` once the game is over.
    pub fn mover(&self) -> Option<Side> {
        match self {
            Self::Player0ToMove => Some(Side::Zero),
            Self::Player1ToMove => Some(Side::One),
            _ => None,
        }
    }

    /// Winning side, `None` while the game is running.
    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::Player0Won => Some(Side::Zero),
            Self::Player1Won => Some(Side::One),
            _ => None,
        }
    }

    /// Check if the game is over (no further moves accepted).
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player0ToMove => "player0_to_move",
            Self::Player1ToMove => "player1_to_move",
            Self::Player0Won => "player0_won",
            Self::Player1Won => "player1_won",
        }
    }
}

impl From<TurnState> for u8 {
    fn from(state: TurnState) -> Self {
        match state {
            TurnState::Player0ToMove => 0,
            TurnState::Player1ToMove => 1,
            TurnState::Player0Won => 2,
            TurnState::Player1Won => 3,
        }
    }
}

/// A turn-state code outside 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown turn state code {0}")]
pub struct UnknownTurnState(pub u8);

impl TryFrom<u8> for TurnState {
    type Error = UnknownTurnState;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Player0ToMove),
            1 => Ok(Self::Player1ToMove),
            2 => Ok(Self::Player0Won),
            3 => Ok(Self::Player1Won),
            other => Err(UnknownTurnState(other)),
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seeds captured by each player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub player0: u32,
    pub player1: u32,
}

impl Score {
    pub fn new(player0: u32, player1: u32) -> Self {
        Self { player0, player1 }
    }

    pub fn of(&self, side: Side) -> u32 {
        match side {
            Side::Zero => self.player0,
            Side::One => self.player1,
        }
    }

    fn add(&mut self, side: Side, seeds: u32) {
        match side {
            Side::Zero => self.player0 += seeds,
            Side::One => self.player1 += seeds,
        }
    }

    /// Both scores together, widened so stored values cannot overflow.
    pub fn total(&self) -> u64 {
        u64::from(self.player0) + u64::from(self.player1)
    }
}

/// How a legal move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Turn passed to the opponent.
    Continuing,
    /// Mover's score passed the threshold.
    MoverWon,
    /// Mover left the opponent's side empty.
    OpponentStarved,
}

impl MoveOutcome {
    pub fn is_win(&self) -> bool {
        !matches!(self, Self::Continuing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continuing => "continuing",
            Self::MoverWon => "mover_won",
            Self::OpponentStarved => "opponent_starved",
        }
    }
}

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    #[error("game is already over")]
    GameOver,
    #[error("pit {0} is off the board")]
    OutOfRange(usize),
    #[error("pit {pit} is not on {side}'s side")]
    WrongSide { pit: usize, side: Side },
    #[error("pit {0} is empty")]
    EmptyPit(usize),
}

/// Game errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),
    #[error("game state invariant violated: {0}")]
    InvariantViolation(String),
    #[error("{0} cannot play against themselves")]
    SamePlayer(String),
}

/// Unordered pair of player names identifying a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameKey {
    first: String,
    second: String,
}

impl GameKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn involves(&self, name: &str) -> bool {
        self.first == name || self.second == name
    }

    pub fn names(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.second)
    }
}

/// One game between two named players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    player0: String,
    player1: String,

    #[serde(rename = "currentState")]
    state: TurnState,

    score: Score,
    board: Board,
}

impl Game {
    /// Start a game with fixed sides: `player0` moves first.
    pub fn new(player0: &str, player1: &str) -> Result<Self, GameError> {
        if player0 == player1 {
            return Err(GameError::SamePlayer(player0.to_string()));
        }
        Ok(Self {
            player0: player0.to_string(),
            player1: player1.to_string(),
            state: TurnState::Player0ToMove,
            score: Score::default(),
            board: Board::new(),
        })
    }

    /// Start a game between two players, flipping a coin for who gets side
    /// zero (and therefore the first move).
    pub fn create<R: Rng>(a: &str, b: &str, rng: &mut R) -> Result<Self, GameError> {
        if rng.gen_bool(0.5) {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    /// Rebuild a game from stored parts. The result is validated.
    pub fn from_parts(
        player0: &str,
        player1: &str,
        board: Board,
        score: Score,
        state: TurnState,
    ) -> Result<Self, GameError> {
        let game = Self {
            player0: player0.to_string(),
            player1: player1.to_string(),
            state,
            score,
            board,
        };
        game.validate()?;
        Ok(game)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn key(&self) -> GameKey {
        GameKey::new(&self.player0, &self.player1)
    }

    pub fn player_name(&self, side: Side) -> &str {
        match side {
            Side::Zero => &self.player0,
            Side::One => &self.player1,
        }
    }

    /// Side a named player sits on.
    pub fn side_of(&self, name: &str) -> Option<Side> {
        if name == self.player0 {
            Some(Side::Zero)
        } else if name == self.player1 {
            Some(Side::One)
        } else {
            None
        }
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.side_of(name).is_some()
    }

    /// Name of the player whose turn it is.
    pub fn player_to_move(&self) -> Option<&str> {
        self.state.mover().map(|side| self.player_name(side))
    }

    /// Name of the winner, once decided.
    pub fn winner(&self) -> Option<&str> {
        self.state.winner().map(|side| self.player_name(side))
    }

    pub fn is_over(&self) -> bool {
        self.state.is_terminal()
    }

    /// Pits the player to move may sow from. Empty once the game is over.
    pub fn legal_pits(&self) -> Vec<usize> {
        match self.state.mover() {
            Some(side) => self.board.non_empty_pits(side).collect(),
            None => Vec::new(),
        }
    }

    /// Seeds on the board plus both scores.
    pub fn seed_total(&self) -> u64 {
        u64::from(self.board.total()) + self.score.total()
    }

    /// Check the record is internally consistent.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.player0 == self.player1 {
            return Err(GameError::InvariantViolation(format!(
                "both sides belong to {}",
                self.player0
            )));
        }
        let total = self.seed_total();
        if total != u64::from(TOTAL_SEEDS) {
            return Err(GameError::InvariantViolation(format!(
                "{} seeds in play, expected {}",
                total, TOTAL_SEEDS
            )));
        }
        Ok(())
    }

    /// Sow from `pit` for the player to move and resolve the turn.
    ///
    /// Returns the resulting game; `self` is never modified.
    pub fn apply_move(&self, pit: usize) -> Result<(Self, MoveOutcome), GameError> {
        self.validate()?;

        let mover = self.state.mover().ok_or(IllegalMove::GameOver)?;
        if pit >= PIT_COUNT {
            return Err(IllegalMove::OutOfRange(pit).into());
        }
        if !mover.owns(pit) {
            return Err(IllegalMove::WrongSide { pit, side: mover }.into());
        }

        let mut next = self.clone();
        let landing = next.board.sow(pit).ok_or(IllegalMove::EmptyPit(pit))?;
        let victim = mover.opponent();

        // Starvation is checked before captures and ends the game outright.
        let outcome = if next.board.is_side_empty(victim) {
            next.state = TurnState::won(mover);
            MoveOutcome::OpponentStarved
        } else {
            let captured = next.board.capture_from(landing, victim);
            next.score.add(mover, captured);

            if next.score.of(mover) > WINNING_SCORE_THRESHOLD {
                next.state = TurnState::won(mover);
                MoveOutcome::MoverWon
            } else {
                next.state = TurnState::to_move(victim);
                MoveOutcome::Continuing
            }
        };

        next.validate()?;
        Ok((next, outcome))
    }

    /// Apply a move in place, leaving `self` unchanged on error.
    pub fn apply_move_mut(&mut self, pit: usize) -> Result<MoveOutcome, GameError> {
        let (next, outcome) = self.apply_move(pit)?;
        *self = next;
        Ok(outcome)
    }

    /// The player to move gives up; the opponent wins. Board and score are
    /// not touched.
    pub fn surrender(&self) -> Result<Self, GameError> {
        let mover = self.state.mover().ok_or(IllegalMove::GameOver)?;
        let mut next = self.clone();
        next.state = TurnState::won(mover.opponent());
        Ok(next)
    }

    /// Convert to the JSON document sent to clients and stored on disk.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "player0": self.player0,
            "player1": self.player1,
            "currentState": u8::from(self.state),
            "score": {
                "player0": self.score.player0,
                "player1": self.score.player1
            },
            "board": self.board.pits()
        })
    }
}
