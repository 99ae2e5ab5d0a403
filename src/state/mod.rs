//! State management module for Awalé.
//!
//! This module provides the core state types and managers:
//!
//! - `board` - Pit geometry, sowing and capture chains
//! - `game` - The game record and the move/surrender transitions
//! - `player` - Player directory and presence
//! - `store` - Game persistence (in memory or a JSON document)
//! - `request` - Client request decoding
//! - `service` - Serialised load/apply/save per game
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          GameService                             │
//! │                                                                  │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌───────────────┐  │
//! │  │  PlayerDirectory │  │    GameStore     │  │  game locks   │  │
//! │  │                  │  │                  │  │               │  │
//! │  │  name →          │  │  {a, b} →        │  │  {a, b} →     │  │
//! │  │    Player        │  │    Game          │  │    Mutex      │  │
//! │  └──────────────────┘  └──────────────────┘  └───────────────┘  │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                 Game::apply_move (pure)                   │   │
//! │  │                                                           │   │
//! │  │  sow ──▶ starvation? ──▶ capture chain ──▶ score > 24? ──▶ │   │
//! │  │                                              turn switch  │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use awale_state::state::{Game, MoveOutcome, TurnState};
//!
//! let game = Game::new("alice", "bob").unwrap();
//! let (game, outcome) = game.apply_move(2).unwrap();
//!
//! assert_eq!(outcome, MoveOutcome::Continuing);
//! assert_eq!(game.state(), TurnState::Player1ToMove);
//! assert_eq!(game.board().pits(), &[4, 4, 0, 5, 5, 5, 5, 4, 4, 4, 4, 4]);
//! ```

pub mod board;
pub mod game;
pub mod player;
pub mod request;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use board::{Board, Side, PITS_PER_SIDE, PIT_COUNT, TOTAL_SEEDS};
pub use game::{
    Game, GameError, GameKey, IllegalMove, MoveOutcome, Score, TurnState, UnknownTurnState,
    WINNING_SCORE_THRESHOLD,
};
pub use player::{
    InvalidTransition, Player, PlayerDirectory, PlayerError, Presence, PresenceEvent,
};
pub use request::{Action, MoveRequest, MoveSelection, Request, RequestError};
pub use service::{GameService, ServiceError};
pub use store::{GameStore, JsonFileStore, MemoryStore, StateDocument, StoreError};
