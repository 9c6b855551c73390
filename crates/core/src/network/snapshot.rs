//! Full-state packets: the host's broadcast of an entire game.

use super::{
    action::NetworkAction,
    packet::{GameData, ACTION_NAME_KEY, GAME_DATA_KEY},
};
use crate::{
    error::{PacketError, Result},
    models::{Game, GameDocument, GameId},
};

/// Decoded content of a game state packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameState {
    /// Full content of the shared game.
    Snapshot(GameDocument),
    /// The host deleted the shared game and closed the session.
    Deleted(GameId),
}

/// Encode the whole of `game` as a state packet sent from `connection_id`.
pub fn to_game_data(game: &Game, connection_id: &str) -> Result<GameData, PacketError> {
    let serialised = serde_json::to_string(&game.to_document())?;
    let mut data = GameData::new(connection_id);
    data.insert(GAME_DATA_KEY, serialised);
    Ok(data)
}

/// Final state published by a host that deleted its shared game.
pub fn deleted_game_data(game_id: GameId, connection_id: &str) -> GameData {
    NetworkAction::GameDeleted { game_id }.to_game_data(connection_id)
}

/// Decode a state packet.
pub fn decode(data: &GameData) -> Result<GameState, PacketError> {
    if data.contains_key(ACTION_NAME_KEY) {
        return match NetworkAction::from_game_data(data)? {
            NetworkAction::GameDeleted { game_id } => Ok(GameState::Deleted(game_id)),
            other => Err(PacketError::UnexpectedAction(other.action_name())),
        };
    }
    let raw = data.require_str(GAME_DATA_KEY)?;
    let document: GameDocument = serde_json::from_str(raw)?;
    crate::models::validate_document(&document)?;
    Ok(GameState::Snapshot(document))
}

impl Game {
    /// Overwrite this game's content with the snapshot carried by `data`.
    ///
    /// Nothing is changed when the packet fails to decode.
    pub fn update_from_game_data(&mut self, data: &GameData) -> Result<()> {
        match decode(data)? {
            GameState::Snapshot(document) => self.update_from_document(document),
            GameState::Deleted(_) => Err(PacketError::UnexpectedAction("GameDeleted").into()),
        }
    }
}
