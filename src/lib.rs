//! Awalé State Library
//!
//! This crate provides the rules engine and state management for networked
//! Awalé (Oware) games.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Rules Engine** - Applies a move to the 12-pit board: sowing, the
//!   starvation check, capture chains and the score threshold. Pure functions
//!   over a [`Game`] value.
//!
//! - **Turn State Machine** - Two "to move" states that alternate and two
//!   absorbing "won" states.
//!
//! - **Player Directory** - Who is registered and who is online.
//!
//! - **Persistence** - A [`GameStore`] trait with in-memory and JSON-document
//!   implementations, keyed by the pair of player names.
//!
//! - **Service** - Decodes client requests and runs load/apply/save for each
//!   game under its own lock.
//!
//! # Design Principles
//!
//! 1. **State machines validate transitions** - Illegal moves are rejected
//!    and leave the game untouched.
//!
//! 2. **The engine does no I/O** - Storage sits behind an injected trait.
//!
//! 3. **No networking** - This crate is pure state, no sockets.
//!
//! 4. **Serialization-ready** - Games and players convert to the JSON
//!    documents clients and the data file use.
//!
//! # Example
//!
//! ```rust
//! use awale_state::config::StateConfig;
//! use awale_state::state::{GameService, MemoryStore, MoveOutcome};
//! use rand::SeedableRng;
//!
//! let service = GameService::new(MemoryStore::new(), &StateConfig::default()).unwrap();
//! service.login("alice").unwrap();
//! service.login("bob").unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let game = service.start_game("alice", "bob", &mut rng).unwrap();
//!
//! let first = game.player_to_move().unwrap().to_string();
//! let other = if first == "alice" { "bob" } else { "alice" };
//! let (_, outcome) = service.play(&first, other, 2).unwrap();
//! assert_eq!(outcome, MoveOutcome::Continuing);
//! ```

pub mod config;
pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
