//! Configuration for the state layer, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::player::{DEFAULT_MAX_NAME_LENGTH, DEFAULT_MAX_PLAYERS};

/// Default number of stored games.
pub const DEFAULT_MAX_GAMES: usize = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Limits and storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// JSON document holding players and games.
    pub data_file: PathBuf,
    pub max_players: usize,
    pub max_games: usize,
    pub max_name_length: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("game.json"),
            max_players: DEFAULT_MAX_PLAYERS,
            max_games: DEFAULT_MAX_GAMES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl StateConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: StateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation("data_file must not be empty".into()));
        }
        if self.max_players < 2 {
            return Err(ConfigError::Validation(
                "max_players must be at least 2".into(),
            ));
        }
        if self.max_games == 0 {
            return Err(ConfigError::Validation("max_games must be > 0".into()));
        }
        if self.max_name_length == 0 {
            return Err(ConfigError::Validation(
                "max_name_length must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        let config = StateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_file, PathBuf::from("game.json"));
        assert_eq!(config.max_players, 100);
        assert_eq!(config.max_games, 100);
        assert_eq!(config.max_name_length, 255);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = StateConfig::from_toml("max_games = 5\n").unwrap();
        assert_eq!(config.max_games, 5);
        assert_eq!(config.max_players, DEFAULT_MAX_PLAYERS);
    }

    #[test]
    fn test_validation_error() {
        let err = StateConfig::from_toml("max_players = 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "config validation error: max_players must be at least 2"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = StateConfig::from_toml("max_games = \"lots\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("awale.toml");
        std::fs::write(&path, "data_file = \"state.json\"\nmax_name_length = 32\n").unwrap();

        let config = StateConfig::load(&path).unwrap();
        assert_eq!(config.data_file, PathBuf::from("state.json"));
        assert_eq!(config.max_name_length, 32);

        let missing = dir.path().join("missing.toml");
        assert_eq!(
            StateConfig::load_or_default(&missing).unwrap(),
            StateConfig::default()
        );
        assert!(matches!(
            StateConfig::load(&missing),
            Err(ConfigError::FileRead { .. })
        ));
    }
}
