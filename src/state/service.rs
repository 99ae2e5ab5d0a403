//! Request handling on top of the engine, the store and the player directory.
//!
//! Every mutation of a game runs load, apply and save while holding that
//! game's lock, so two connections racing on the same pair of players can
//! never apply a move to a stale board. Different games only contend on the
//! short store access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use super::board::Side;
use super::game::{Game, GameError, GameKey, IllegalMove, MoveOutcome};
use super::player::{PlayerDirectory, PlayerError};
use super::request::{Action, MoveRequest, MoveSelection, Request, RequestError};
use super::store::{GameStore, JsonFileStore, StoreError};
use crate::config::StateConfig;

/// Service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    #[error("{0} is not online")]
    PlayerOffline(String),

    #[error("game limit reached ({0} games)")]
    TooManyGames(usize),

    #[error("{0} requests are not supported")]
    Unsupported(Action),
}

impl ServiceError {
    /// Check if the error is a refused move (the caller should re-prompt).
    pub fn is_illegal_move(&self) -> bool {
        matches!(
            self,
            Self::Game(GameError::IllegalMove(_)) | Self::NotYourTurn(_)
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Game service - owns the store and the player directory.
#[derive(Debug)]
pub struct GameService<S: GameStore> {
    store: Mutex<S>,
    players: Mutex<PlayerDirectory>,
    /// One lock per game key, held across load/apply/save. Entries live only
    /// while some caller holds or waits on them.
    game_locks: Mutex<HashMap<GameKey, Arc<Mutex<()>>>>,
    max_games: usize,
}

impl GameService<JsonFileStore> {
    /// Open the JSON document named by the config.
    pub fn from_config(config: &StateConfig) -> Result<Self, ServiceError> {
        Self::new(JsonFileStore::new(config.data_file.clone()), config)
    }
}

impl<S: GameStore> GameService<S> {
    /// Wrap a store, restoring the player directory from it.
    pub fn new(store: S, config: &StateConfig) -> Result<Self, ServiceError> {
        let mut players = PlayerDirectory::with_limits(config.max_players, config.max_name_length);
        players.restore(store.load_players()?);
        tracing::info!(
            players = players.count(),
            games = store.count()?,
            "game service ready"
        );

        Ok(Self {
            store: Mutex::new(store),
            players: Mutex::new(players),
            game_locks: Mutex::new(HashMap::new()),
            max_games: config.max_games,
        })
    }

    /// Run `f` while holding the lock for `key`.
    fn with_game_lock<T>(
        &self,
        key: &GameKey,
        f: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let game_lock = lock(&self.game_locks)
            .entry(key.clone())
            .or_default()
            .clone();
        let result = {
            let _guard = lock(&game_lock);
            f()
        };

        // Clones are only handed out under `game_locks`, so a count of two
        // (the table's and ours) means nobody else is waiting.
        let mut locks = lock(&self.game_locks);
        if Arc::strong_count(&game_lock) == 2 {
            locks.remove(key);
        }
        result
    }

    /// Mark a player online, registering the name on first login.
    pub fn login(&self, name: &str) -> Result<bool, ServiceError> {
        let mut players = lock(&self.players);
        let is_new = players.login(name)?;
        lock(&self.store).save_players(&players.players())?;
        tracing::info!(player = name, is_new, "player logged in");
        Ok(is_new)
    }

    pub fn logout(&self, name: &str) -> Result<(), ServiceError> {
        let mut players = lock(&self.players);
        players.logout(name)?;
        lock(&self.store).save_players(&players.players())?;
        tracing::info!(player = name, "player logged out");
        Ok(())
    }

    /// Names of online players, sorted.
    pub fn online_players(&self) -> Vec<String> {
        lock(&self.players).online_players()
    }

    pub fn is_online(&self, name: &str) -> bool {
        lock(&self.players).is_online(name)
    }

    /// Create a game between two online players; a coin flip picks who
    /// moves first.
    pub fn start_game<R: Rng>(&self, a: &str, b: &str, rng: &mut R) -> Result<Game, ServiceError> {
        {
            let players = lock(&self.players);
            for name in [a, b] {
                if !players.is_online(name) {
                    return Err(ServiceError::PlayerOffline(name.to_string()));
                }
            }
        }

        let game = Game::create(a, b, rng)?;
        let key = game.key();
        self.with_game_lock(&key, || {
            let mut store = lock(&self.store);
            if store.count()? >= self.max_games {
                return Err(ServiceError::TooManyGames(self.max_games));
            }
            Ok(store.insert(&game)?)
        })?;

        tracing::info!(
            %key,
            player0 = game.player_name(Side::Zero),
            player1 = game.player_name(Side::One),
            "game created"
        );
        Ok(game)
    }

    /// Load a game without locking it (read-only snapshot).
    pub fn game(&self, a: &str, b: &str) -> Result<Game, ServiceError> {
        Ok(lock(&self.store).load(a, b)?)
    }

    /// Remove a finished or abandoned game.
    pub fn delete_game(&self, a: &str, b: &str) -> Result<Game, ServiceError> {
        let key = GameKey::new(a, b);
        let game = self.with_game_lock(&key, || Ok(lock(&self.store).delete(a, b)?))?;
        tracing::info!(%key, "game deleted");
        Ok(game)
    }

    /// Check `player` may act on `game` right now.
    fn check_turn(game: &Game, player: &str) -> Result<(), ServiceError> {
        match game.player_to_move() {
            None => Err(GameError::IllegalMove(IllegalMove::GameOver).into()),
            Some(to_move) if to_move != player => {
                Err(ServiceError::NotYourTurn(player.to_string()))
            }
            Some(_) => Ok(()),
        }
    }

    /// Run load, transition and save for one game under its lock.
    fn transact<T>(
        &self,
        player: &str,
        opponent: &str,
        transition: impl FnOnce(&Game) -> Result<(Game, T), ServiceError>,
    ) -> Result<(Game, T), ServiceError> {
        let key = GameKey::new(player, opponent);
        self.with_game_lock(&key, || {
            let game = lock(&self.store).load(player, opponent)?;
            Self::check_turn(&game, player)?;

            let (next, extra) = transition(&game)?;
            lock(&self.store).save(&next)?;
            Ok((next, extra))
        })
    }

    /// Sow from `pit` (0-11) for `mover` in their game against `opponent`.
    pub fn play(
        &self,
        mover: &str,
        opponent: &str,
        pit: usize,
    ) -> Result<(Game, MoveOutcome), ServiceError> {
        let (game, outcome) = self.transact(mover, opponent, |game| Ok(game.apply_move(pit)?))?;

        tracing::debug!(
            mover,
            pit,
            outcome = outcome.as_str(),
            board = %game.board(),
            "move applied"
        );
        if let Some(winner) = game.winner() {
            tracing::info!(
                key = %game.key(),
                winner,
                outcome = outcome.as_str(),
                score0 = game.score().player0,
                score1 = game.score().player1,
                "game over"
            );
        }
        Ok((game, outcome))
    }

    /// `player` gives up their game against `opponent`.
    pub fn surrender(&self, player: &str, opponent: &str) -> Result<Game, ServiceError> {
        let (game, ()) = self.transact(player, opponent, |game| Ok((game.surrender()?, ())))?;
        tracing::info!(key = %game.key(), player, "player surrendered");
        Ok(game)
    }

    /// Apply a decoded move selection.
    pub fn submit(&self, request: &MoveRequest) -> Result<Game, ServiceError> {
        match request.selection {
            MoveSelection::Surrender => self.surrender(&request.mover, &request.opponent),
            MoveSelection::Sow(pit) => self
                .play(&request.mover, &request.opponent, pit)
                .map(|(game, _)| game),
        }
    }

    /// Handle a client request, producing the JSON reply.
    ///
    /// `LOGIN` replies `true`, `LIST` the online names, `MOVE` the updated
    /// game document.
    pub fn handle(&self, request: &Request) -> Result<serde_json::Value, ServiceError> {
        let result = self.dispatch(request);
        if let Err(e) = &result {
            tracing::warn!(action = %request.action, error = %e, "request rejected");
        }
        result
    }

    fn dispatch(&self, request: &Request) -> Result<serde_json::Value, ServiceError> {
        match request.action {
            Action::Login => self
                .login(request.argument(0)?)
                .map(|_| serde_json::Value::Bool(true)),
            Action::List => Ok(serde_json::json!(self.online_players())),
            Action::Move => {
                let mv = MoveRequest::from_request(request)?;
                self.submit(&mv).map(|game| game.to_json())
            }
            Action::Challenge | Action::Accept => Err(ServiceError::Unsupported(request.action)),
        }
    }
}
