//! Game persistence.
//!
//! The engine never touches storage; callers go through a [`GameStore`].
//! Games are keyed by the unordered pair of player names, so at most one
//! game exists per pair.
//!
//! Stores do no locking of their own. Load, apply and save for one game must
//! run as a critical section; [`crate::state::service::GameService`] provides
//! that.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::game::{Game, GameError, GameKey};
use super::player::Player;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no game between {0}")]
    NotFound(GameKey),

    #[error("a game between {0} already exists")]
    AlreadyExists(GameKey),

    #[error("corrupt game record {key}: {source}")]
    Corrupt { key: GameKey, source: GameError },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load/save interface for games and the player directory.
pub trait GameStore {
    /// Load the game between two players, in either order.
    fn load(&self, a: &str, b: &str) -> Result<Game, StoreError>;

    /// Insert or replace a game.
    fn save(&mut self, game: &Game) -> Result<(), StoreError>;

    /// Insert a game, failing if the pair already has one.
    fn insert(&mut self, game: &Game) -> Result<(), StoreError>;

    /// Remove and return the game between two players.
    fn delete(&mut self, a: &str, b: &str) -> Result<Game, StoreError>;

    /// All games a player takes part in.
    fn games_for(&self, name: &str) -> Result<Vec<Game>, StoreError>;

    /// Number of stored games.
    fn count(&self) -> Result<usize, StoreError>;

    fn load_players(&self) -> Result<Vec<Player>, StoreError>;

    fn save_players(&mut self, players: &[Player]) -> Result<(), StoreError>;
}

fn checked(game: Game) -> Result<Game, StoreError> {
    game.validate().map_err(|source| StoreError::Corrupt {
        key: game.key(),
        source,
    })?;
    Ok(game)
}

/// In-memory store, indexed by pair and by player.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: HashMap<GameKey, Game>,
    /// Player name to the keys of their games
    player_index: HashMap<String, BTreeSet<GameKey>>,
    players: Vec<Player>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&mut self, key: &GameKey) {
        let (a, b) = key.names();
        for name in [a, b] {
            self.player_index
                .entry(name.to_string())
                .or_default()
                .insert(key.clone());
        }
    }

    fn unindex(&mut self, key: &GameKey) {
        let (a, b) = key.names();
        for name in [a, b] {
            if let Some(keys) = self.player_index.get_mut(name) {
                keys.remove(key);
                if keys.is_empty() {
                    self.player_index.remove(name);
                }
            }
        }
    }
}

impl GameStore for MemoryStore {
    fn load(&self, a: &str, b: &str) -> Result<Game, StoreError> {
        let key = GameKey::new(a, b);
        self.games
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))
    }

    fn save(&mut self, game: &Game) -> Result<(), StoreError> {
        let game = checked(game.clone())?;
        let key = game.key();
        self.index(&key);
        self.games.insert(key, game);
        Ok(())
    }

    fn insert(&mut self, game: &Game) -> Result<(), StoreError> {
        let key = game.key();
        if self.games.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        self.save(game)
    }

    fn delete(&mut self, a: &str, b: &str) -> Result<Game, StoreError> {
        let key = GameKey::new(a, b);
        let game = self
            .games
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        self.unindex(&key);
        Ok(game)
    }

    fn games_for(&self, name: &str) -> Result<Vec<Game>, StoreError> {
        Ok(self
            .player_index
            .get(name)
            .map(|keys| keys.iter().filter_map(|k| self.games.get(k)).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.games.len())
    }

    fn load_players(&self) -> Result<Vec<Player>, StoreError> {
        Ok(self.players.clone())
    }

    fn save_players(&mut self, players: &[Player]) -> Result<(), StoreError> {
        self.players = players.to_vec();
        Ok(())
    }
}

/// On-disk document: every player and every game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub games: Vec<Game>,
}

/// Store backed by a single JSON document.
///
/// Every write rewrites the whole document through a temporary file and a
/// rename, so readers never see a half-written file. A missing file reads as
/// an empty document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the whole document.
    pub fn read_document(&self) -> Result<StateDocument, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "data file missing, starting empty");
                return Ok(StateDocument::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the whole document.
    pub fn write_document(&self, doc: &StateDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn position(doc: &StateDocument, key: &GameKey) -> Option<usize> {
        doc.games.iter().position(|g| &g.key() == key)
    }
}

impl GameStore for JsonFileStore {
    fn load(&self, a: &str, b: &str) -> Result<Game, StoreError> {
        let key = GameKey::new(a, b);
        let mut doc = self.read_document()?;
        let idx = Self::position(&doc, &key).ok_or(StoreError::NotFound(key))?;
        checked(doc.games.swap_remove(idx))
    }

    fn save(&mut self, game: &Game) -> Result<(), StoreError> {
        let game = checked(game.clone())?;
        let mut doc = self.read_document()?;
        match Self::position(&doc, &game.key()) {
            Some(idx) => doc.games[idx] = game,
            None => doc.games.push(game),
        }
        self.write_document(&doc)
    }

    fn insert(&mut self, game: &Game) -> Result<(), StoreError> {
        let game = checked(game.clone())?;
        let mut doc = self.read_document()?;
        let key = game.key();
        if Self::position(&doc, &key).is_some() {
            return Err(StoreError::AlreadyExists(key));
        }
        doc.games.push(game);
        self.write_document(&doc)
    }

    fn delete(&mut self, a: &str, b: &str) -> Result<Game, StoreError> {
        let key = GameKey::new(a, b);
        let mut doc = self.read_document()?;
        let idx = Self::position(&doc, &key).ok_or_else(|| StoreError::NotFound(key))?;
        let game = doc.games.remove(idx);
        self.write_document(&doc)?;
        Ok(game)
    }

    fn games_for(&self, name: &str) -> Result<Vec<Game>, StoreError> {
        let doc = self.read_document()?;
        Ok(doc
            .games
            .into_iter()
            .filter(|g| g.has_player(name))
            .filter_map(|g| match checked(g) {
                Ok(g) => Some(g),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt game record");
                    None
                }
            })
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read_document()?.games.len())
    }

    fn load_players(&self) -> Result<Vec<Player>, StoreError> {
        Ok(self.read_document()?.players)
    }

    fn save_players(&mut self, players: &[Player]) -> Result<(), StoreError> {
        let mut doc = self.read_document()?;
        doc.players = players.to_vec();
        self.write_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::Board;
    use crate::state::game::{Score, TurnState};
    use crate::state::player::Presence;
    use pretty_assertions::assert_eq;

    fn exercise_store(store: &mut dyn GameStore) {
        let game = Game::new("alice", "bob").unwrap();
        store.insert(&game).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        // Either name order finds the game.
        assert_eq!(store.load("bob", "alice").unwrap(), game);
        assert!(matches!(
            store.insert(&game),
            Err(StoreError::AlreadyExists(_))
        ));

        let (moved, _) = game.apply_move(2).unwrap();
        store.save(&moved).unwrap();
        assert_eq!(store.load("alice", "bob").unwrap(), moved);
        assert_eq!(store.count().unwrap(), 1);

        store.insert(&Game::new("carol", "alice").unwrap()).unwrap();
        assert_eq!(store.games_for("alice").unwrap().len(), 2);
        assert_eq!(store.games_for("bob").unwrap().len(), 1);
        assert!(store.games_for("dave").unwrap().is_empty());

        assert_eq!(store.delete("alice", "bob").unwrap(), moved);
        assert!(matches!(
            store.load("alice", "bob"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("alice", "bob"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.games_for("bob").unwrap().len(), 0);

        let mut alice = Player::new("alice");
        alice.online = Presence::Online;
        store.save_players(&[alice.clone()]).unwrap();
        assert_eq!(store.load_players().unwrap(), vec![alice]);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        exercise_store(&mut store);
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("game.json"));
        exercise_store(&mut store);
        assert!(store.path().exists());
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.read_document().unwrap(), StateDocument::default());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_reads_legacy_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(
            &path,
            r#"{
                "players": [{"name": "alice", "online": true}, {"name": "bob", "online": false}],
                "active_players": [],
                "games": [{
                    "player0": "alice",
                    "player1": "bob",
                    "currentState": 1,
                    "score": {"player0": 4, "player1": 0},
                    "board": [4, 4, 0, 5, 5, 5, 5, 4, 0, 4, 4, 4]
                }]
            }"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        let game = store.load("alice", "bob").unwrap();
        assert_eq!(game.state(), TurnState::Player1ToMove);
        assert_eq!(game.score(), Score::new(4, 0));
        assert_eq!(
            game.board(),
            &Board::from_pits([4, 4, 0, 5, 5, 5, 5, 4, 0, 4, 4, 4])
        );

        let players = store.load_players().unwrap();
        assert_eq!(players.len(), 2);
        assert!(players[0].is_online());
    }

    #[test]
    fn test_corrupt_record_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(
            &path,
            r#"{"games": [{
                "player0": "alice", "player1": "bob", "currentState": 0,
                "score": {"player0": 0, "player1": 0},
                "board": [9, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4]
            }]}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.load("alice", "bob"),
            Err(StoreError::Corrupt { .. })
        ));
        assert!(store.games_for("alice").unwrap().is_empty());
    }

    #[test]
    fn test_overflowing_score_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(
            &path,
            r#"{"games": [{
                "player0": "alice", "player1": "bob", "currentState": 0,
                "score": {"player0": 4294967295, "player1": 1},
                "board": [4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4]
            }]}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        match store.load("alice", "bob") {
            Err(StoreError::Corrupt { source, .. }) => {
                assert!(matches!(source, GameError::InvariantViolation(_)))
            }
            other => panic!("expected a corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.count(), Err(StoreError::Json { .. })));
    }
}
