//! Error types shared by the domain model, the action protocol and the
//! synchronisation engine.

use thiserror::Error;

use crate::models::{GameId, PlayerId};

/// Result alias used across the crate.
pub type Result<T, E = ScoreboardError> = std::result::Result<T, E>;

/// Failures raised while decoding a network packet or snapshot.
#[derive(Debug, Error)]
pub enum PacketError {
    /// A key required by the decoded variant is absent.
    #[error("illegal game data packet: does not contain {0}")]
    MissingKey(&'static str),
    /// The `actionName` discriminator names no known action.
    #[error("illegal game data packet: actionName {0} is unknown")]
    UnknownAction(String),
    /// A key is present but holds a value of the wrong shape.
    #[error("illegal game data packet: {key} {reason}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Human readable description of the problem.
        reason: String,
    },
    /// The embedded snapshot could not be parsed.
    #[error("illegal game data packet: malformed snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),
    /// An action arrived where a full game state was expected.
    #[error("illegal game data packet: unexpected {0} action in game state")]
    UnexpectedAction(&'static str),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum ScoreboardError {
    /// A score line did not contain exactly one value per player.
    #[error("the size of the submitted score list must match the size of the player list (score list size was {actual}, player list size was {expected})")]
    ScoreCountMismatch {
        /// Number of players in the game.
        expected: usize,
        /// Number of submitted scores.
        actual: usize,
    },
    /// A score line index outside `[0, len)`.
    #[error("score line index {index} is out of range (score count is {len})")]
    LineOutOfRange {
        /// Requested index.
        index: usize,
        /// Current score count.
        len: usize,
    },
    /// The player is not a member of the game.
    #[error("player {0} is not part of this game")]
    UnknownPlayer(PlayerId),
    /// A player with this id already exists in the game.
    #[error("player {0} already exists in this game")]
    DuplicatePlayer(PlayerId),
    /// No game with this id is managed here.
    #[error("game {0} is not managed by this game manager")]
    UnknownGame(GameId),
    /// Sharing was requested for a game that is already shared.
    #[error("cannot share game {0}, game is already shared")]
    AlreadyShared(GameId),
    /// A session operation was requested for a game that is not shared.
    #[error("game {0} is not shared")]
    NotShared(GameId),
    /// Network data was about to be sent before a connection id existed.
    #[error("cannot send network data: not yet connected")]
    NotConnected,
    /// The transport dropped a pending request without completing it.
    #[error("shared session is unavailable: {0}")]
    SessionUnavailable(String),
    /// The session code entered by the user is not well formed.
    #[error("invalid session code {0:?}")]
    InvalidSessionCode(String),
    /// A packet or snapshot could not be decoded.
    #[error(transparent)]
    IllegalPacket(#[from] PacketError),
    /// Reading or writing the persistence gateway failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
