//! Host replay and guest overwrite of a shared game.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    error::Result,
    models::Game,
    network::{
        snapshot::{self, GameState},
        ApplyOutcome, GameData, NetworkAction,
    },
};

/// What a guest did with an inbound game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestUpdate {
    /// The game is not a guest of a session; nothing changed.
    Ignored,
    /// Local content was replaced by the host's snapshot.
    Updated,
    /// The host deleted the game; the session is over.
    SessionClosed,
}

/// Result of one host replay pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    /// State to publish; already remembered as the last transmitted state.
    pub state: GameData,
    /// Contributions to report back as processed.
    pub processed: Vec<GameData>,
    /// Contributions applied to the game.
    pub applied: usize,
    /// Contributions that failed to decode or to apply.
    pub skipped: usize,
    /// Contributions already folded into an earlier state.
    pub already_applied: usize,
}

/// Per-game reconciliation state.
///
/// The host keeps the last state it transmitted. Every batch of guest
/// contributions is replayed on top of that state, in delivery order, and the
/// result becomes the new last transmitted state.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_state: Option<GameData>,
    consumed: HashSet<String>,
}

impl Reconciler {
    /// State for a game that has not transmitted anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state transmitted or received.
    pub fn last_state(&self) -> Option<&GameData> {
        self.last_state.as_ref()
    }

    /// Record a state the host just transmitted on its own.
    pub fn remember(&mut self, state: GameData) {
        self.last_state = Some(state);
    }

    /// Guest side: overwrite `game` with the host's state. Unsent local edits
    /// are lost.
    pub fn apply_game_state(&mut self, game: &mut Game, state: &GameData) -> Result<GuestUpdate> {
        if game.is_host() != Some(false) {
            return Ok(GuestUpdate::Ignored);
        }
        match snapshot::decode(state)? {
            GameState::Snapshot(document) => {
                game.without_network(|game| game.update_from_document(document))?;
                self.last_state = Some(state.clone());
                Ok(GuestUpdate::Updated)
            }
            GameState::Deleted(_) => Ok(GuestUpdate::SessionClosed),
        }
    }

    /// Host side: reset `game` to the last transmitted state, replay the
    /// pending contributions and encode the result.
    ///
    /// A contribution that fails to decode or to apply is skipped; the others
    /// are still applied. Returns `None` when `game` is not hosting.
    pub fn replay_contributions(
        &mut self,
        game: &mut Game,
        pending: &[GameData],
        connection_id: &str,
    ) -> Result<Option<ReplayReport>> {
        if game.is_host() != Some(true) {
            return Ok(None);
        }

        let mut applied = 0;
        let mut skipped = 0;
        let mut already_applied = 0;
        let consumed = &self.consumed;
        let last_state = self.last_state.as_ref();
        game.without_network(|game| -> Result<()> {
            if let Some(last_state) = last_state {
                game.update_from_game_data(last_state)?;
            }
            for packet in pending {
                if packet.packet_id().is_some_and(|id| consumed.contains(id)) {
                    already_applied += 1;
                    continue;
                }
                match replay_one(game, packet) {
                    Ok(()) => applied += 1,
                    Err(reason) => {
                        skipped += 1;
                        warn!(
                            game_id = game.id(),
                            from = %packet.connection_id,
                            "skipping guest contribution: {reason}"
                        );
                    }
                }
            }
            Ok(())
        })?;

        let state = snapshot::to_game_data(game, connection_id)?;
        self.last_state = Some(state.clone());
        self.consumed = pending
            .iter()
            .filter_map(|packet| packet.packet_id().map(str::to_string))
            .collect();
        debug!(
            game_id = game.id(),
            applied, skipped, already_applied, "guest contributions replayed"
        );
        Ok(Some(ReplayReport {
            state,
            processed: pending.to_vec(),
            applied,
            skipped,
            already_applied,
        }))
    }
}

fn replay_one(game: &mut Game, packet: &GameData) -> Result<(), String> {
    let action = NetworkAction::from_game_data(packet).map_err(|err| err.to_string())?;
    match action.apply_to(game).map_err(|err| err.to_string())? {
        ApplyOutcome::Applied => Ok(()),
        ApplyOutcome::GameDeleted(_) => Err("guests cannot delete the shared game".to_string()),
    }
}
