//! Client request decoding.
//!
//! Requests arrive as `{"action": "MOVE", "arguments": [...]}`. Move slots on
//! the wire are 1-based, with `0` meaning surrender; [`MoveSelection`] turns
//! them into engine pit indices.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::board::PIT_COUNT;

/// Request actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Login,
    Challenge,
    Accept,
    List,
    Move,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Challenge => "CHALLENGE",
            Self::Accept => "ACCEPT",
            Self::List => "LIST",
            Self::Move => "MOVE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{action} request is missing argument {index}")]
    MissingArgument { action: Action, index: usize },

    #[error("invalid slot {0:?}, expected 0 (surrender) or 1-12")]
    InvalidSlot(String),
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl Request {
    pub fn new(action: Action, arguments: &[&str]) -> Self {
        Self {
            action,
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "action": self.action.as_str(),
            "arguments": self.arguments
        })
    }

    /// Positional argument, trimmed.
    pub fn argument(&self, index: usize) -> Result<&str, RequestError> {
        self.arguments
            .get(index)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .ok_or(RequestError::MissingArgument {
                action: self.action,
                index,
            })
    }
}

/// What the mover chose to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSelection {
    Surrender,
    /// Sow from an engine pit index (0-11).
    Sow(usize),
}

impl MoveSelection {
    /// Decode a wire slot: `0` surrenders, `1`-`12` select pits 0-11.
    pub fn decode(slot: &str) -> Result<Self, RequestError> {
        let invalid = || RequestError::InvalidSlot(slot.to_string());
        let n: usize = slot.trim().parse().map_err(|_| invalid())?;
        match n {
            0 => Ok(Self::Surrender),
            n if n <= PIT_COUNT => Ok(Self::Sow(n - 1)),
            _ => Err(invalid()),
        }
    }

    /// Wire slot for this selection.
    pub fn encode(&self) -> usize {
        match self {
            Self::Surrender => 0,
            Self::Sow(pit) => pit + 1,
        }
    }
}

/// A `MOVE` request: `[mover, opponent, slot]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub mover: String,
    pub opponent: String,
    pub selection: MoveSelection,
}

impl MoveRequest {
    pub fn from_request(request: &Request) -> Result<Self, RequestError> {
        Ok(Self {
            mover: request.argument(0)?.to_string(),
            opponent: request.argument(1)?.to_string(),
            selection: MoveSelection::decode(request.argument(2)?)?,
        })
    }
}
