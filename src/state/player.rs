//! Player directory and presence.
//!
//! Every name that ever logged in has a record. Presence is a two-state
//! machine:
//!
//! ```text
//! ┌─────────┐   login    ┌────────┐
//! │ Offline │───────────▶│ Online │──┐
//! └─────────┘            └────────┘  │ login (reconnect)
//!      ▲                  │   ▲      │
//!      │      logout      │   └──────┘
//!      └──────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default directory capacity.
pub const DEFAULT_MAX_PLAYERS: usize = 100;

/// Default maximum length of a player name, in bytes.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 255;

/// Whether a player is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    #[default]
    Offline,
    Online,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "Offline"),
            Self::Online => write!(f, "Online"),
        }
    }
}

/// Presence transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Login,
    Logout,
}

/// Error when a presence transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition from {from} via {event:?}: {reason}")]
pub struct InvalidTransition {
    pub from: Presence,
    pub event: PresenceEvent,
    pub reason: &'static str,
}

impl Presence {
    /// Calculate the presence after an event.
    pub fn apply(self, event: PresenceEvent) -> Result<Self, InvalidTransition> {
        use Presence::*;
        use PresenceEvent::*;

        match (self, event) {
            (_, Login) => Ok(Online),
            (Online, Logout) => Ok(Offline),
            (Offline, Logout) => Err(InvalidTransition {
                from: self,
                event,
                reason: "Not logged in",
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// A directory entry.
///
/// Serialized as `{"name": ..., "online": ...}`; `last_login` is optional so
/// older documents without it still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,

    #[serde(with = "presence_flag")]
    pub online: Presence,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

mod presence_flag {
    use super::Presence;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(presence: &Presence, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(presence.is_online())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Presence, D::Error> {
        Ok(if bool::deserialize(d)? {
            Presence::Online
        } else {
            Presence::Offline
        })
    }
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            online: Presence::Offline,
            last_login: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.is_online()
    }
}

/// Player directory errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("player name must not be empty")]
    EmptyName,
    #[error("player name is longer than {max} bytes")]
    NameTooLong { max: usize },
    #[error("player directory is full ({0} players)")]
    Full(usize),
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Player directory - every known player by name.
#[derive(Debug, Clone)]
pub struct PlayerDirectory {
    players: HashMap<String, Player>,
    max_players: usize,
    max_name_length: usize,
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_PLAYERS, DEFAULT_MAX_NAME_LENGTH)
    }

    pub fn with_limits(max_players: usize, max_name_length: usize) -> Self {
        Self {
            players: HashMap::new(),
            max_players,
            max_name_length,
        }
    }

    /// Rebuild a directory from stored records.
    ///
    /// Records past capacity are still loaded; the limit only gates new names.
    /// Everyone comes back offline, since no connection survives a restart.
    pub fn restore(&mut self, players: impl IntoIterator<Item = Player>) {
        for mut player in players {
            player.online = Presence::Offline;
            self.players.insert(player.name.clone(), player);
        }
    }

    /// Check a name is acceptable for a new player.
    pub fn validate_name(&self, name: &str) -> Result<(), PlayerError> {
        if name.trim().is_empty() {
            return Err(PlayerError::EmptyName);
        }
        if name.len() > self.max_name_length {
            return Err(PlayerError::NameTooLong {
                max: self.max_name_length,
            });
        }
        Ok(())
    }

    /// Mark a player online, registering the name on first login.
    ///
    /// Returns `true` if the player is new.
    pub fn login(&mut self, name: &str) -> Result<bool, PlayerError> {
        let is_new = !self.players.contains_key(name);
        if is_new {
            self.validate_name(name)?;
            if self.players.len() >= self.max_players {
                return Err(PlayerError::Full(self.max_players));
            }
            self.players.insert(name.to_string(), Player::new(name));
        }

        let player = self
            .players
            .get_mut(name)
            .ok_or_else(|| PlayerError::UnknownPlayer(name.to_string()))?;
        player.online = player.online.apply(PresenceEvent::Login)?;
        player.last_login = Some(Utc::now());

        Ok(is_new)
    }

    /// Mark a player offline.
    pub fn logout(&mut self, name: &str) -> Result<(), PlayerError> {
        let player = self
            .players
            .get_mut(name)
            .ok_or_else(|| PlayerError::UnknownPlayer(name.to_string()))?;
        player.online = player.online.apply(PresenceEvent::Logout)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.players.get(name).is_some_and(Player::is_online)
    }

    /// Names of online players, sorted.
    pub fn online_players(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .players
            .values()
            .filter(|p| p.is_online())
            .map(|p| p.name.clone())
            .collect();
        names.sort();
        names
    }

    /// All records, sorted by name.
    pub fn players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn online_count(&self) -> usize {
        self.players.values().filter(|p| p.is_online()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presence_transitions() {
        let offline = Presence::default();
        assert!(!offline.is_online());

        let online = offline.apply(PresenceEvent::Login).unwrap();
        assert!(online.is_online());

        // Reconnect keeps the player online.
        assert_eq!(online.apply(PresenceEvent::Login), Ok(Presence::Online));
        assert_eq!(online.apply(PresenceEvent::Logout), Ok(Presence::Offline));

        let err = offline.apply(PresenceEvent::Logout).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition from Offline via Logout: Not logged in"
        );
    }

    #[test]
    fn test_login_registers_once() {
        let mut dir = PlayerDirectory::new();

        assert_eq!(dir.login("alice"), Ok(true));
        assert_eq!(dir.login("alice"), Ok(false));
        assert_eq!(dir.count(), 1);
        assert!(dir.is_online("alice"));
        assert!(dir.get("alice").unwrap().last_login.is_some());
    }

    #[test]
    fn test_logout() {
        let mut dir = PlayerDirectory::new();
        dir.login("alice").unwrap();
        dir.logout("alice").unwrap();

        assert!(!dir.is_online("alice"));
        assert!(dir.contains("alice"));
        assert!(matches!(
            dir.logout("alice"),
            Err(PlayerError::InvalidTransition(_))
        ));
        assert_eq!(
            dir.logout("nobody"),
            Err(PlayerError::UnknownPlayer("nobody".to_string()))
        );
    }

    #[test]
    fn test_online_players_sorted() {
        let mut dir = PlayerDirectory::new();
        dir.login("carol").unwrap();
        dir.login("alice").unwrap();
        dir.login("bob").unwrap();
        dir.logout("carol").unwrap();

        assert_eq!(dir.online_players(), vec!["alice", "bob"]);
        assert_eq!(dir.online_count(), 2);
    }

    #[test]
    fn test_name_validation() {
        let mut dir = PlayerDirectory::with_limits(10, 5);

        assert_eq!(dir.login(""), Err(PlayerError::EmptyName));
        assert_eq!(dir.login("   "), Err(PlayerError::EmptyName));
        assert_eq!(
            dir.login("abcdef"),
            Err(PlayerError::NameTooLong { max: 5 })
        );
        assert_eq!(dir.login("abcde"), Ok(true));
    }

    #[test]
    fn test_directory_capacity() {
        let mut dir = PlayerDirectory::with_limits(2, 255);
        dir.login("alice").unwrap();
        dir.login("bob").unwrap();

        assert_eq!(dir.login("carol"), Err(PlayerError::Full(2)));
        // Known players can still log back in.
        dir.logout("alice").unwrap();
        assert_eq!(dir.login("alice"), Ok(false));
    }

    #[test]
    fn test_player_json_shape() {
        let player = Player {
            name: "alice".to_string(),
            online: Presence::Online,
            last_login: None,
        };
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json, serde_json::json!({"name": "alice", "online": true}));

        let parsed: Player =
            serde_json::from_value(serde_json::json!({"name": "bob", "online": false})).unwrap();
        assert_eq!(parsed.online, Presence::Offline);
        assert_eq!(parsed.last_login, None);
    }

    #[test]
    fn test_restore() {
        let mut dir = PlayerDirectory::new();
        dir.restore(vec![Player::new("alice"), Player::new("bob")]);
        assert_eq!(dir.count(), 2);
        assert!(dir.online_players().is_empty());
        assert_eq!(
            dir.players().iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn test_restore_marks_everyone_offline() {
        let mut alice = Player::new("alice");
        alice.online = Presence::Online;
        alice.last_login = Some(Utc::now());

        let mut dir = PlayerDirectory::new();
        dir.restore(vec![alice]);
        assert!(!dir.is_online("alice"));
        assert!(dir.get("alice").unwrap().last_login.is_some());

        assert_eq!(dir.login("alice"), Ok(false));
        assert_eq!(dir.online_players(), vec!["alice"]);
    }
}
