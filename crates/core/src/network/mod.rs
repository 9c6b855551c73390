//! Network action protocol: packets, discrete actions and full-state snapshots.

mod action;
mod packet;
pub mod snapshot;

pub use action::{ApplyOutcome, NetworkAction};
pub use packet::{
    GameData, ACTION_NAME_KEY, GAME_DATA_KEY, GAME_ID_KEY, GAME_MODE_KEY, GAME_NAME_KEY,
    PACKET_ID_KEY, PLAYER_ID_KEY, PLAYER_NAME_KEY, SCORE_ARRAY_KEY, SCORE_LINE_INDEX_KEY,
};
pub use snapshot::GameState;

use crate::{error::Result, models::Game};

/// Outbound side of a shared game, installed on the game while it is shared.
///
/// A game calls exactly one of the emitting methods per mutation; which one
/// depends on its role in the session.
pub trait NetworkSink: Send + Sync {
    /// Host role: publish the complete state of `game`.
    fn broadcast_state(&self, game: &Game) -> Result<()>;
    /// Guest role: propose `action` to the host.
    fn send_action(&self, game: &Game, action: NetworkAction) -> Result<()>;
    /// `game` is about to be deleted locally.
    fn game_deleted(&self, game: &Game) -> Result<()>;
    /// Tear down the connection; calling it again has no effect.
    fn release(&self);
}
