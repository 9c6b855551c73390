use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PacketError;

/// Discriminator naming the encoded [`NetworkAction`](super::NetworkAction).
pub const ACTION_NAME_KEY: &str = "actionName";
/// Identifier assigned by the sending session to each guest contribution.
pub const PACKET_ID_KEY: &str = "packetId";
/// Serialised game snapshot.
pub const GAME_DATA_KEY: &str = "gameData";

/// Player name of a player action.
pub const PLAYER_NAME_KEY: &str = "playerName";
/// Player id of a player action.
pub const PLAYER_ID_KEY: &str = "playerId";
/// Scoring mode.
pub const GAME_MODE_KEY: &str = "gameMode";
/// Game name.
pub const GAME_NAME_KEY: &str = "gameName";
/// Game id of a deletion.
pub const GAME_ID_KEY: &str = "gameId";
/// One score per player.
pub const SCORE_ARRAY_KEY: &str = "scoreArray";
/// Index of a score line.
pub const SCORE_LINE_INDEX_KEY: &str = "scoreLineIndex";

/// Flat key/value packet exchanged through the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    /// Connection that produced the packet.
    pub connection_id: String,
    /// Packet content.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl GameData {
    /// Empty packet sent from `connection_id`.
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            data: Map::new(),
        }
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Id assigned by the sending session, if any.
    pub fn packet_id(&self) -> Option<&str> {
        self.data.get(PACKET_ID_KEY).and_then(Value::as_str)
    }

    /// Tag the packet with a sender-assigned id.
    pub fn with_packet_id(mut self, id: impl Into<String>) -> Self {
        self.insert(PACKET_ID_KEY, id.into());
        self
    }

    fn require(&self, key: &'static str) -> Result<&Value, PacketError> {
        match self.data.get(key) {
            Some(Value::Null) | None => Err(PacketError::MissingKey(key)),
            Some(value) => Ok(value),
        }
    }

    pub(crate) fn require_str(&self, key: &'static str) -> Result<&str, PacketError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| invalid(key, "is not a string"))
    }

    /// Optional string; an explicit `null` counts as absent.
    pub(crate) fn optional_str(&self, key: &'static str) -> Result<Option<&str>, PacketError> {
        match self.data.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(_) => Err(invalid(key, "is not a string")),
        }
    }

    pub(crate) fn require_u32(&self, key: &'static str) -> Result<u32, PacketError> {
        self.require(key)?
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| invalid(key, "is not a non-negative 32-bit integer"))
    }

    pub(crate) fn require_index(&self, key: &'static str) -> Result<usize, PacketError> {
        self.require(key)?
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| invalid(key, "is not a valid index"))
    }

    pub(crate) fn require_scores(&self, key: &'static str) -> Result<Vec<i64>, PacketError> {
        let values = self
            .require(key)?
            .as_array()
            .ok_or_else(|| invalid(key, "is not an array"))?;
        values
            .iter()
            .map(|value| {
                value
                    .as_i64()
                    .ok_or_else(|| invalid(key, "contains a non-integer score"))
            })
            .collect()
    }
}

fn invalid(key: &'static str, reason: &str) -> PacketError {
    PacketError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors_validate_shapes() {
        let mut data = GameData::new("conn");
        data.insert(PLAYER_ID_KEY, 3u32);
        data.insert(PLAYER_NAME_KEY, Value::Null);
        data.insert(SCORE_ARRAY_KEY, json!([1, -2, "x"]));
        data.insert(GAME_NAME_KEY, 7);

        assert_eq!(data.require_u32(PLAYER_ID_KEY).unwrap(), 3);
        assert_eq!(data.optional_str(PLAYER_NAME_KEY).unwrap(), None);
        assert!(matches!(
            data.require_str(PLAYER_NAME_KEY),
            Err(PacketError::MissingKey(PLAYER_NAME_KEY))
        ));
        assert!(matches!(
            data.require_scores(SCORE_ARRAY_KEY),
            Err(PacketError::InvalidValue { key: SCORE_ARRAY_KEY, .. })
        ));
        assert!(data.optional_str(GAME_NAME_KEY).is_err());
        assert!(matches!(
            data.require_index(SCORE_LINE_INDEX_KEY),
            Err(PacketError::MissingKey(SCORE_LINE_INDEX_KEY))
        ));
    }

    #[test]
    fn packet_ids_are_optional() {
        let data = GameData::new("conn");
        assert_eq!(data.packet_id(), None);
        let data = data.with_packet_id("conn-1");
        assert_eq!(data.packet_id(), Some("conn-1"));
    }
}
