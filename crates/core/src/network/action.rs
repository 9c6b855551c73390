use serde_json::Value;

use super::packet::{
    GameData, ACTION_NAME_KEY, GAME_ID_KEY, GAME_MODE_KEY, GAME_NAME_KEY, PLAYER_ID_KEY,
    PLAYER_NAME_KEY, SCORE_ARRAY_KEY, SCORE_LINE_INDEX_KEY,
};
use crate::{
    error::{PacketError, Result},
    models::{Game, GameId, GameMode, PlayerId},
};

/// A single state change of a [`Game`], as proposed by a guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAction {
    /// A player joined the game.
    PlayerAdded {
        /// Id chosen by the sender.
        player_id: PlayerId,
        /// Optional player name.
        player_name: Option<String>,
    },
    /// A player left the game.
    PlayerRemoved {
        /// Removed player.
        player_id: PlayerId,
    },
    /// Every player was removed.
    PlayersCleared,
    /// The scoring mode changed.
    GameModeChanged {
        /// New mode.
        mode: GameMode,
    },
    /// The game was renamed.
    GameNameChanged {
        /// New name.
        name: String,
    },
    /// The game was deleted.
    GameDeleted {
        /// Deleted game.
        game_id: GameId,
    },
    /// A score line was appended.
    ScoreLineAdded {
        /// One score per player.
        scores: Vec<i64>,
    },
    /// A score line was replaced.
    ScoreLineModified {
        /// Line index.
        index: usize,
        /// One score per player.
        scores: Vec<i64>,
    },
    /// A score line was removed.
    ScoreLineRemoved {
        /// Line index.
        index: usize,
    },
    /// A player was renamed.
    PlayerNameChanged {
        /// Renamed player.
        player_id: PlayerId,
        /// New name; `None` clears it.
        player_name: Option<String>,
    },
}

/// What applying an action did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The game was mutated in place.
    Applied,
    /// The action asks for the game to be deleted; the caller owns the
    /// roster and decides.
    GameDeleted(GameId),
}

impl NetworkAction {
    /// Value of the `actionName` discriminator.
    pub fn action_name(&self) -> &'static str {
        match self {
            NetworkAction::PlayerAdded { .. } => "PlayerAdded",
            NetworkAction::PlayerRemoved { .. } => "PlayerRemoved",
            NetworkAction::PlayersCleared => "PlayersCleared",
            NetworkAction::GameModeChanged { .. } => "GameModeChanged",
            NetworkAction::GameNameChanged { .. } => "GameNameChanged",
            NetworkAction::GameDeleted { .. } => "GameDeleted",
            NetworkAction::ScoreLineAdded { .. } => "ScoreLineAdded",
            NetworkAction::ScoreLineModified { .. } => "ScoreLineModified",
            NetworkAction::ScoreLineRemoved { .. } => "ScoreLineRemoved",
            NetworkAction::PlayerNameChanged { .. } => "PlayerNameChanged",
        }
    }

    /// Encode as a flat packet sent from `connection_id`.
    pub fn to_game_data(&self, connection_id: &str) -> GameData {
        let mut data = GameData::new(connection_id);
        data.insert(ACTION_NAME_KEY, self.action_name());
        match self {
            NetworkAction::PlayerAdded {
                player_id,
                player_name,
            }
            | NetworkAction::PlayerNameChanged {
                player_id,
                player_name,
            } => {
                data.insert(PLAYER_ID_KEY, *player_id);
                if let Some(name) = player_name {
                    data.insert(PLAYER_NAME_KEY, name.as_str());
                }
            }
            NetworkAction::PlayerRemoved { player_id } => data.insert(PLAYER_ID_KEY, *player_id),
            NetworkAction::PlayersCleared => {}
            NetworkAction::GameModeChanged { mode } => data.insert(GAME_MODE_KEY, mode.as_str()),
            NetworkAction::GameNameChanged { name } => data.insert(GAME_NAME_KEY, name.as_str()),
            NetworkAction::GameDeleted { game_id } => data.insert(GAME_ID_KEY, *game_id),
            NetworkAction::ScoreLineAdded { scores } => {
                data.insert(SCORE_ARRAY_KEY, scores.clone())
            }
            NetworkAction::ScoreLineModified { index, scores } => {
                data.insert(SCORE_ARRAY_KEY, scores.clone());
                data.insert(SCORE_LINE_INDEX_KEY, Value::from(*index));
            }
            NetworkAction::ScoreLineRemoved { index } => {
                data.insert(SCORE_LINE_INDEX_KEY, Value::from(*index))
            }
        }
        data
    }

    /// Decode a packet, dispatching on `actionName`.
    pub fn from_game_data(data: &GameData) -> Result<Self, PacketError> {
        let action = match data.require_str(ACTION_NAME_KEY)? {
            "PlayerAdded" => NetworkAction::PlayerAdded {
                player_id: data.require_u32(PLAYER_ID_KEY)?,
                player_name: data.optional_str(PLAYER_NAME_KEY)?.map(str::to_string),
            },
            "PlayerRemoved" => NetworkAction::PlayerRemoved {
                player_id: data.require_u32(PLAYER_ID_KEY)?,
            },
            "PlayersCleared" => NetworkAction::PlayersCleared,
            "GameModeChanged" => {
                let raw = data.require_str(GAME_MODE_KEY)?;
                let mode = GameMode::parse(raw).ok_or_else(|| PacketError::InvalidValue {
                    key: GAME_MODE_KEY,
                    reason: format!("{raw} is not a game mode"),
                })?;
                NetworkAction::GameModeChanged { mode }
            }
            "GameNameChanged" => NetworkAction::GameNameChanged {
                name: data.require_str(GAME_NAME_KEY)?.to_string(),
            },
            "GameDeleted" => NetworkAction::GameDeleted {
                game_id: data.require_u32(GAME_ID_KEY)?,
            },
            "ScoreLineAdded" => NetworkAction::ScoreLineAdded {
                scores: data.require_scores(SCORE_ARRAY_KEY)?,
            },
            "ScoreLineModified" => NetworkAction::ScoreLineModified {
                index: data.require_index(SCORE_LINE_INDEX_KEY)?,
                scores: data.require_scores(SCORE_ARRAY_KEY)?,
            },
            "ScoreLineRemoved" => NetworkAction::ScoreLineRemoved {
                index: data.require_index(SCORE_LINE_INDEX_KEY)?,
            },
            "PlayerNameChanged" => NetworkAction::PlayerNameChanged {
                player_id: data.require_u32(PLAYER_ID_KEY)?,
                player_name: data.optional_str(PLAYER_NAME_KEY)?.map(str::to_string),
            },
            other => return Err(PacketError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// Replay the action against `game` through its regular mutators.
    pub fn apply_to(&self, game: &mut Game) -> Result<ApplyOutcome> {
        match self {
            NetworkAction::PlayerAdded {
                player_id,
                player_name,
            } => {
                game.create_player_with_id(*player_id, player_name.as_deref())?;
            }
            NetworkAction::PlayerRemoved { player_id } => {
                game.remove_player(*player_id)?;
            }
            NetworkAction::PlayersCleared => game.clear_players()?,
            NetworkAction::GameModeChanged { mode } => game.set_mode(*mode)?,
            NetworkAction::GameNameChanged { name } => game.set_name(name.as_str())?,
            NetworkAction::GameDeleted { game_id } => {
                return Ok(ApplyOutcome::GameDeleted(*game_id))
            }
            NetworkAction::ScoreLineAdded { scores } => game.add_score_line(scores)?,
            NetworkAction::ScoreLineModified { index, scores } => {
                game.modify_score_line_at(*index, scores)?
            }
            NetworkAction::ScoreLineRemoved { index } => game.remove_score_line_at(*index)?,
            NetworkAction::PlayerNameChanged {
                player_id,
                player_name,
            } => game.set_player_name(*player_id, player_name.as_deref())?,
        }
        Ok(ApplyOutcome::Applied)
    }
}
