//! Scoreboard domain models.

mod game;
mod observable;
mod player;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use game::{Game, SharingState};
pub(crate) use game::validate_document;
pub use observable::{ListChange, ObservableList};
pub use player::Player;

/// Identifier of a game, unique within one game manager.
pub type GameId = u32;

/// Identifier of a player, unique within one game.
pub type PlayerId = u32;

/// Which end of the score range wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// The largest total wins.
    #[default]
    HighScore,
    /// The smallest total wins.
    LowScore,
}

impl GameMode {
    /// Wire and storage spelling of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::HighScore => "HIGH_SCORE",
            GameMode::LowScore => "LOW_SCORE",
        }
    }

    /// The opposite mode; losers under `self` are winners under the result.
    pub fn inverted(self) -> Self {
        match self {
            GameMode::HighScore => GameMode::LowScore,
            GameMode::LowScore => GameMode::HighScore,
        }
    }

    /// Whether total `candidate` is strictly better than `current`.
    pub fn is_better(self, candidate: i64, current: i64) -> bool {
        match self {
            GameMode::HighScore => candidate > current,
            GameMode::LowScore => candidate < current,
        }
    }

    /// Parse the wire and storage spelling of the mode.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HIGH_SCORE" => Some(GameMode::HighScore),
            "LOW_SCORE" => Some(GameMode::LowScore),
            _ => None,
        }
    }
}

/// Structured document describing a whole game.
///
/// Used both as the persisted form and as the snapshot the host broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    /// Game identifier.
    pub id: GameId,
    /// Name as entered by the user.
    #[serde(default)]
    pub name: String,
    /// Scoring mode.
    #[serde(default)]
    pub mode: GameMode,
    /// Session id while shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_id: Option<String>,
    /// Role while shared: `true` for the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host_of_shared_game: Option<bool>,
    /// Players with their score columns.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Time of the last save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_spelling_matches_wire_format() {
        for mode in [GameMode::HighScore, GameMode::LowScore] {
            assert_eq!(GameMode::parse(mode.as_str()), Some(mode));
            assert_eq!(
                serde_json::to_value(mode).unwrap(),
                serde_json::json!(mode.as_str())
            );
        }
        assert_eq!(GameMode::parse("MEDIUM_SCORE"), None);
    }
}
