use std::{borrow::Cow, collections::HashSet, fmt, sync::Arc};

use tracing::{debug, warn};

use super::{GameDocument, GameId, GameMode, ListChange, ObservableList, Player, PlayerId};
use crate::{
    error::{PacketError, Result, ScoreboardError},
    network::{NetworkAction, NetworkSink},
    ranking::ValueSortedMap,
    save::GameStorage,
};

/// Role of this device in a shared session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SharingState {
    /// Not shared.
    #[default]
    Unshared,
    /// This device opened the session and holds the authoritative state.
    Host {
        /// Room the session runs in.
        session_id: String,
    },
    /// This device joined a session opened elsewhere.
    Guest {
        /// Room the session runs in.
        session_id: String,
    },
}

/// One scoreboard: a mode, a set of players and their score columns.
///
/// Every mutator validates its input, applies the change, saves the game
/// once and, when the game is shared, emits once to the network: the host
/// rebroadcasts the full state, a guest sends the single matching action.
pub struct Game {
    id: GameId,
    name: String,
    mode: GameMode,
    players: ObservableList<Player>,
    sharing: SharingState,
    storage: Option<GameStorage>,
    network: Option<Arc<dyn NetworkSink>>,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("players", &&*self.players)
            .field("sharing", &self.sharing)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Create a detached game that is neither persisted nor shared.
    pub fn new(id: GameId, name: Option<&str>, mode: GameMode) -> Self {
        Self {
            id,
            name: name.unwrap_or_default().to_string(),
            mode,
            players: ObservableList::default(),
            sharing: SharingState::Unshared,
            storage: None,
            network: None,
        }
    }

    pub(crate) fn with_storage(mut self, storage: GameStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Rebuild a game from its document. The result is always unshared; a
    /// live session never outlives the process that opened it.
    pub fn from_document(
        document: GameDocument,
        storage: Option<GameStorage>,
    ) -> Result<Self, PacketError> {
        validate_document(&document)?;
        Ok(Self {
            id: document.id,
            name: document.name,
            mode: document.mode,
            players: ObservableList::new(document.players),
            sharing: SharingState::Unshared,
            storage,
            network: None,
        })
    }

    /// Structured copy of the whole game.
    pub fn to_document(&self) -> GameDocument {
        GameDocument {
            id: self.id,
            name: self.name.clone(),
            mode: self.mode,
            shared_id: self.shared_session_id().map(str::to_string),
            is_host_of_shared_game: self.is_host(),
            players: self.players.to_vec(),
            saved_at: None,
        }
    }

    /// Overwrite name, mode and players from `document`.
    ///
    /// Identity, storage wiring and the sharing role of this game are kept.
    /// The result is saved but never emitted to the network.
    pub(crate) fn update_from_document(&mut self, document: GameDocument) -> Result<()> {
        validate_document(&document)?;
        self.name = document.name;
        self.mode = document.mode;
        self.players.reset(document.players);
        self.persist()
    }

    /// Identifier, unique within the owning manager.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Name as entered by the user; may be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name to show for the game at `position` in the roster.
    pub fn display_name(&self, position: usize) -> Cow<'_, str> {
        if self.name.trim().is_empty() {
            Cow::Owned(format!("Game {}", position + 1))
        } else {
            Cow::Borrowed(&self.name)
        }
    }

    /// Rename the game.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.name = name.clone();
        self.commit(NetworkAction::GameNameChanged { name })
    }

    /// Which end of the score range wins.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Switch between high-score and low-score mode.
    pub fn set_mode(&mut self, mode: GameMode) -> Result<()> {
        self.mode = mode;
        self.commit(NetworkAction::GameModeChanged { mode })
    }

    /// Players in column order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player `id`, if part of the game.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id() == id)
    }

    /// Position of player `id` in the player list.
    pub fn player_index(&self, id: PlayerId) -> Result<usize> {
        self.players
            .iter()
            .position(|player| player.id() == id)
            .ok_or(ScoreboardError::UnknownPlayer(id))
    }

    fn next_player_id(&self) -> PlayerId {
        self.players
            .iter()
            .map(Player::id)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Add a player with the next free id and a zero for every score line.
    pub fn create_player(&mut self, name: Option<&str>) -> Result<PlayerId> {
        let id = self.next_player_id();
        self.insert_player(id, name)
    }

    /// Add a player with an explicit id, as requested by a replayed action.
    pub fn create_player_with_id(&mut self, id: PlayerId, name: Option<&str>) -> Result<PlayerId> {
        if self.player(id).is_some() {
            return Err(ScoreboardError::DuplicatePlayer(id));
        }
        self.insert_player(id, name)
    }

    fn insert_player(&mut self, id: PlayerId, name: Option<&str>) -> Result<PlayerId> {
        let player = Player::new(id, name.map(str::to_string), vec![0; self.score_count()]);
        let change = self.players.push(player);
        self.on_players_changed(&change)?;
        Ok(id)
    }

    /// Remove player `id` together with its score column.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player> {
        let index = self.player_index(id)?;
        let change = self
            .players
            .remove(index)
            .ok_or(ScoreboardError::UnknownPlayer(id))?;
        self.on_players_changed(&change)?;
        match change {
            ListChange::Removed { item, .. } => Ok(item),
            _ => Err(ScoreboardError::UnknownPlayer(id)),
        }
    }

    /// Remove every player.
    pub fn clear_players(&mut self) -> Result<()> {
        let change = self.players.clear();
        self.on_players_changed(&change)
    }

    /// Rename player `id`; `None` clears the name.
    pub fn set_player_name(&mut self, id: PlayerId, name: Option<&str>) -> Result<()> {
        let index = self.player_index(id)?;
        let mut renamed = self.players[index].clone();
        renamed.set_name(name.map(str::to_string));
        let change = self
            .players
            .replace(index, renamed)
            .ok_or(ScoreboardError::UnknownPlayer(id))?;
        self.on_players_changed(&change)
    }

    fn on_players_changed(&mut self, change: &ListChange<Player>) -> Result<()> {
        let action = match change {
            ListChange::Added { index } => {
                let player = &self.players[*index];
                NetworkAction::PlayerAdded {
                    player_id: player.id(),
                    player_name: player.name().map(str::to_string),
                }
            }
            ListChange::Replaced { index, .. } => {
                let player = &self.players[*index];
                NetworkAction::PlayerNameChanged {
                    player_id: player.id(),
                    player_name: player.name().map(str::to_string),
                }
            }
            ListChange::Removed { item, .. } => NetworkAction::PlayerRemoved {
                player_id: item.id(),
            },
            ListChange::Cleared { .. } => NetworkAction::PlayersCleared,
        };
        self.commit(action)
    }

    /// Number of score lines; every player holds exactly this many scores.
    pub fn score_count(&self) -> usize {
        self.players.first().map_or(0, |player| player.scores().len())
    }

    fn check_line_length(&self, scores: &[i64]) -> Result<()> {
        if scores.len() != self.players.len() {
            return Err(ScoreboardError::ScoreCountMismatch {
                expected: self.players.len(),
                actual: scores.len(),
            });
        }
        Ok(())
    }

    fn check_line_index(&self, index: usize) -> Result<()> {
        let len = self.score_count();
        if index >= len {
            return Err(ScoreboardError::LineOutOfRange { index, len });
        }
        Ok(())
    }

    /// Append a score line holding one score per player, in player order.
    pub fn add_score_line(&mut self, scores: &[i64]) -> Result<()> {
        self.check_line_length(scores)?;
        for (player, score) in self.players.iter_mut().zip(scores) {
            player.scores_mut().push(*score);
        }
        self.commit(NetworkAction::ScoreLineAdded {
            scores: scores.to_vec(),
        })
    }

    /// Append a line of zeros.
    pub fn add_empty_score_line(&mut self) -> Result<()> {
        let zeros = vec![0; self.players.len()];
        self.add_score_line(&zeros)
    }

    /// Replace the scores of line `index`, one per player.
    pub fn modify_score_line_at(&mut self, index: usize, scores: &[i64]) -> Result<()> {
        self.check_line_length(scores)?;
        self.check_line_index(index)?;
        for (player, score) in self.players.iter_mut().zip(scores) {
            player.scores_mut()[index] = *score;
        }
        self.commit(NetworkAction::ScoreLineModified {
            index,
            scores: scores.to_vec(),
        })
    }

    /// Remove line `index` from every player.
    pub fn remove_score_line_at(&mut self, index: usize) -> Result<()> {
        self.check_line_index(index)?;
        for player in self.players.iter_mut() {
            player.scores_mut().remove(index);
        }
        self.commit(NetworkAction::ScoreLineRemoved { index })
    }

    /// One score per player for line `index`.
    pub fn score_line_at(&self, index: usize) -> Result<Vec<i64>> {
        self.check_line_index(index)?;
        Ok(self
            .players
            .iter()
            .map(|player| player.scores()[index])
            .collect())
    }

    /// Positions of every player holding the best total.
    pub fn winners(&self) -> Vec<usize> {
        self.extremal_positions(self.mode)
    }

    /// Positions of every player holding the worst total.
    pub fn losers(&self) -> Vec<usize> {
        self.extremal_positions(self.mode.inverted())
    }

    fn extremal_positions(&self, preference: GameMode) -> Vec<usize> {
        let mut best = None;
        let mut positions = Vec::new();
        for (position, player) in self.players.iter().enumerate() {
            let total = player.total_score();
            match best {
                Some(current) if total == current => positions.push(position),
                Some(current) if !preference.is_better(total, current) => {}
                _ => {
                    best = Some(total);
                    positions.clear();
                    positions.push(position);
                }
            }
        }
        positions
    }

    /// Players with their totals, best first; equal totals keep id order.
    pub fn ranking(&self) -> Vec<(&Player, i64)> {
        let mut sorted = match self.mode {
            GameMode::HighScore => ValueSortedMap::descending(),
            GameMode::LowScore => ValueSortedMap::ascending(),
        };
        sorted.extend(
            self.players
                .iter()
                .map(|player| (player.id(), player.total_score())),
        );
        sorted
            .iter()
            .filter_map(|(id, total)| self.player(*id).map(|player| (player, *total)))
            .collect()
    }

    /// Role of this game in a shared session.
    pub fn sharing(&self) -> &SharingState {
        &self.sharing
    }

    /// Whether the game takes part in a shared session.
    pub fn is_shared(&self) -> bool {
        self.sharing != SharingState::Unshared
    }

    /// Session id of the shared session, `None` when unshared.
    pub fn shared_session_id(&self) -> Option<&str> {
        match &self.sharing {
            SharingState::Unshared => None,
            SharingState::Host { session_id } | SharingState::Guest { session_id } => {
                Some(session_id)
            }
        }
    }

    /// `Some(true)` when hosting, `Some(false)` when joined as guest.
    pub fn is_host(&self) -> Option<bool> {
        match self.sharing {
            SharingState::Unshared => None,
            SharingState::Host { .. } => Some(true),
            SharingState::Guest { .. } => Some(false),
        }
    }

    /// Enter a shared session. A host broadcasts its full state right away.
    pub(crate) fn attach_session(
        &mut self,
        sharing: SharingState,
        sink: Arc<dyn NetworkSink>,
    ) -> Result<()> {
        if self.is_shared() {
            return Err(ScoreboardError::AlreadyShared(self.id));
        }
        self.sharing = sharing;
        self.network = Some(sink);
        self.persist()?;
        if let (SharingState::Host { .. }, Some(sink)) = (&self.sharing, &self.network) {
            sink.broadcast_state(self)?;
        }
        Ok(())
    }

    /// Leave the shared session, releasing the network handler once.
    pub(crate) fn detach_session(&mut self) -> Result<()> {
        if let Some(sink) = self.network.take() {
            sink.release();
        }
        if !self.is_shared() {
            return Ok(());
        }
        self.sharing = SharingState::Unshared;
        self.persist()
    }

    /// Tell the session this game is being deleted, then leave it.
    pub(crate) fn announce_deletion(&mut self) -> Result<()> {
        if let Some(sink) = &self.network {
            if let Err(err) = sink.game_deleted(self) {
                debug!(game_id = self.id, %err, "could not announce deletion");
            }
        }
        if let Some(sink) = self.network.take() {
            sink.release();
        }
        self.sharing = SharingState::Unshared;
        Ok(())
    }

    /// Run `apply` with network emission switched off, for state that
    /// arrived from the network or is being replayed.
    pub(crate) fn without_network<R>(&mut self, apply: impl FnOnce(&mut Self) -> R) -> R {
        let sink = self.network.take();
        let result = apply(self);
        if self.network.is_none() {
            self.network = sink;
        }
        result
    }

    pub(crate) fn persist(&self) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.save_game(&self.to_document())?;
        }
        Ok(())
    }

    pub(crate) fn remove_from_storage(&self) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.remove_game(self.id)?;
        }
        Ok(())
    }

    /// Save, then emit. The local change stands even when emitting fails.
    fn commit(&self, action: NetworkAction) -> Result<()> {
        self.persist()?;
        let Some(sink) = &self.network else {
            return Ok(());
        };
        let emitted = match self.sharing {
            SharingState::Unshared => Ok(()),
            SharingState::Host { .. } => sink.broadcast_state(self),
            SharingState::Guest { .. } => sink.send_action(self, action),
        };
        if let Err(err) = emitted {
            warn!(game_id = self.id, %err, "change kept locally but not sent");
        }
        Ok(())
    }
}

/// Reject documents whose score columns differ in length or whose player
/// ids repeat.
pub(crate) fn validate_document(document: &GameDocument) -> Result<(), PacketError> {
    let mut ids = HashSet::new();
    let expected = document.players.first().map_or(0, |p| p.scores().len());
    for player in &document.players {
        if !ids.insert(player.id()) {
            return Err(PacketError::InvalidValue {
                key: "players",
                reason: format!("contains player {} twice", player.id()),
            });
        }
        if player.scores().len() != expected {
            return Err(PacketError::InvalidValue {
                key: "players",
                reason: format!(
                    "score column of player {} has {} entries, expected {expected}",
                    player.id(),
                    player.scores().len()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::MemoryStore;
    use parking_lot::Mutex;

    fn alice_and_bob() -> Game {
        let mut game = Game::new(0, Some("G1"), GameMode::HighScore);
        game.create_player(Some("Alice")).unwrap();
        game.create_player(Some("Bob")).unwrap();
        game
    }

    #[derive(Default)]
    struct RecordingSink {
        states: Mutex<Vec<GameDocument>>,
        actions: Mutex<Vec<NetworkAction>>,
        released: Mutex<u32>,
    }

    impl NetworkSink for RecordingSink {
        fn broadcast_state(&self, game: &Game) -> Result<()> {
            self.states.lock().push(game.to_document());
            Ok(())
        }

        fn send_action(&self, _game: &Game, action: NetworkAction) -> Result<()> {
            self.actions.lock().push(action);
            Ok(())
        }

        fn game_deleted(&self, _game: &Game) -> Result<()> {
            Ok(())
        }

        fn release(&self) {
            *self.released.lock() += 1;
        }
    }

    #[test]
    fn totals_winners_and_losers() {
        let mut game = alice_and_bob();
        game.add_score_line(&[3, 5]).unwrap();
        game.add_score_line(&[10, 1]).unwrap();

        assert_eq!(game.players()[0].total_score(), 13);
        assert_eq!(game.players()[1].total_score(), 6);
        assert_eq!(game.winners(), vec![0]);
        assert_eq!(game.losers(), vec![1]);

        game.set_mode(GameMode::LowScore).unwrap();
        assert_eq!(game.winners(), vec![1]);
        assert_eq!(game.losers(), vec![0]);
        assert_eq!(game.players()[0].total_score(), 13);
    }

    #[test]
    fn ties_and_empty_games() {
        let mut game = Game::new(0, None, GameMode::HighScore);
        assert!(game.winners().is_empty());
        assert!(game.losers().is_empty());

        for name in ["a", "b", "c"] {
            game.create_player(Some(name)).unwrap();
        }
        game.add_score_line(&[4, 4, 4]).unwrap();
        assert_eq!(game.winners(), vec![0, 1, 2]);
        assert_eq!(game.losers(), vec![0, 1, 2]);

        game.add_score_line(&[1, 1, 0]).unwrap();
        assert_eq!(game.winners(), vec![0, 1]);
        assert_eq!(game.losers(), vec![2]);
    }

    #[test]
    fn ranking_orders_best_first() {
        let mut game = alice_and_bob();
        game.create_player(Some("Carol")).unwrap();
        game.add_score_line(&[5, 9, 5]).unwrap();

        let ranking: Vec<_> = game
            .ranking()
            .into_iter()
            .map(|(player, total)| (player.id(), total))
            .collect();
        assert_eq!(ranking, vec![(1, 9), (0, 5), (2, 5)]);

        game.set_mode(GameMode::LowScore).unwrap();
        let ranking: Vec<_> = game
            .ranking()
            .into_iter()
            .map(|(player, total)| (player.id(), total))
            .collect();
        assert_eq!(ranking, vec![(0, 5), (2, 5), (1, 9)]);
    }

    #[test]
    fn score_lines_keep_columns_aligned() {
        let mut game = alice_and_bob();
        game.add_score_line(&[1, 2]).unwrap();
        game.add_score_line(&[3, 4]).unwrap();
        game.add_score_line(&[5, 6]).unwrap();

        game.add_score_line(&[7, 8]).unwrap();
        game.remove_score_line_at(3).unwrap();
        assert_eq!(game.score_count(), 3);
        for index in 0..game.score_count() {
            assert_eq!(game.score_line_at(index).unwrap().len(), 2);
        }

        game.remove_score_line_at(1).unwrap();
        assert_eq!(game.score_line_at(0).unwrap(), vec![1, 2]);
        assert_eq!(game.score_line_at(1).unwrap(), vec![5, 6]);
        assert_eq!(game.players()[1].sub_total_at(1).unwrap(), 8);

        let carol = game.create_player(Some("Carol")).unwrap();
        assert_eq!(game.player(carol).unwrap().scores(), &[0, 0]);
    }

    #[test]
    fn invalid_lines_leave_state_untouched() {
        let mut game = alice_and_bob();
        game.add_score_line(&[1, 2]).unwrap();

        let err = game.modify_score_line_at(0, &[9]).unwrap_err();
        assert!(matches!(
            err,
            ScoreboardError::ScoreCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(matches!(
            game.modify_score_line_at(1, &[9, 9]),
            Err(ScoreboardError::LineOutOfRange { index: 1, len: 1 })
        ));
        assert!(game.add_score_line(&[1, 2, 3]).is_err());
        assert!(game.remove_score_line_at(5).is_err());
        assert!(game.score_line_at(1).is_err());

        assert_eq!(game.players()[0].scores(), &[1]);
        assert_eq!(game.players()[1].scores(), &[2]);
    }

    #[test]
    fn player_ids_follow_the_highest_id() {
        let mut game = alice_and_bob();
        let carol = game.create_player(Some("Carol")).unwrap();
        assert_eq!(carol, 2);

        game.remove_player(2).unwrap();
        assert_eq!(game.create_player(None).unwrap(), 2);

        game.remove_player(0).unwrap();
        assert_eq!(game.create_player(None).unwrap(), 3);

        game.clear_players().unwrap();
        assert_eq!(game.create_player(None).unwrap(), 0);

        assert!(matches!(
            game.create_player_with_id(0, None),
            Err(ScoreboardError::DuplicatePlayer(0))
        ));
        assert!(matches!(
            game.remove_player(42),
            Err(ScoreboardError::UnknownPlayer(42))
        ));
    }

    #[test]
    fn renaming_players_and_positional_names() {
        let mut game = Game::new(0, Some(" "), GameMode::HighScore);
        assert_eq!(game.display_name(1), "Game 2");
        let id = game.create_player(None).unwrap();
        assert_eq!(game.players()[0].display_name(0), "Player 1");

        game.set_player_name(id, Some("Dora")).unwrap();
        assert_eq!(game.player(id).unwrap().name(), Some("Dora"));
        assert!(game.set_player_name(7, Some("Nobody")).is_err());
    }

    #[test]
    fn every_mutation_saves_the_game() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = GameStorage::new(store);
        let mut game = Game::new(4, Some("Saved"), GameMode::HighScore).with_storage(storage.clone());

        game.create_player(Some("Alice"))?;
        game.add_score_line(&[12])?;
        game.set_name("Renamed")?;

        let stored = storage.load_game(4)?.expect("game saved");
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.players[0].scores(), &[12]);
        Ok(())
    }

    #[test]
    fn host_broadcasts_and_guest_sends_actions() {
        let sink = Arc::new(RecordingSink::default());
        let mut host = alice_and_bob();
        host.attach_session(
            SharingState::Host {
                session_id: "room".into(),
            },
            sink.clone(),
        )
        .unwrap();
        host.add_score_line(&[1, 1]).unwrap();
        assert_eq!(sink.states.lock().len(), 2);
        assert!(sink.actions.lock().is_empty());

        let guest_sink = Arc::new(RecordingSink::default());
        let mut guest = alice_and_bob();
        guest
            .attach_session(
                SharingState::Guest {
                    session_id: "room".into(),
                },
                guest_sink.clone(),
            )
            .unwrap();
        assert!(guest_sink.states.lock().is_empty());
        guest.add_score_line(&[2, 3]).unwrap();
        guest.set_player_name(1, None).unwrap();
        assert_eq!(
            *guest_sink.actions.lock(),
            vec![
                NetworkAction::ScoreLineAdded { scores: vec![2, 3] },
                NetworkAction::PlayerNameChanged {
                    player_id: 1,
                    player_name: None
                },
            ]
        );

        assert!(matches!(
            guest.attach_session(SharingState::Unshared, guest_sink.clone()),
            Err(ScoreboardError::AlreadyShared(0))
        ));
        guest.detach_session().unwrap();
        guest.detach_session().unwrap();
        assert_eq!(*guest_sink.released.lock(), 1);
        assert_eq!(guest.is_host(), None);
    }

    #[test]
    fn huge_totals_still_rank() {
        let mut game = Game::new(0, None, GameMode::HighScore);
        game.create_player(Some("Alice")).unwrap();
        game.create_player(Some("Bob")).unwrap();
        game.add_score_line(&[i64::MAX, 0]).unwrap();
        game.add_score_line(&[1, 0]).unwrap();

        assert_eq!(game.players()[0].total_score(), i64::MIN);
        assert_eq!(game.winners(), vec![1]);
        assert_eq!(game.losers(), vec![0]);
        assert_eq!(game.ranking()[0].0.id(), 1);
    }

    struct FailingSink;

    impl NetworkSink for FailingSink {
        fn broadcast_state(&self, _game: &Game) -> Result<()> {
            Err(ScoreboardError::NotConnected)
        }

        fn send_action(&self, _game: &Game, _action: NetworkAction) -> Result<()> {
            Err(ScoreboardError::SessionUnavailable("room is closed".into()))
        }

        fn game_deleted(&self, _game: &Game) -> Result<()> {
            Ok(())
        }

        fn release(&self) {}
    }

    #[test]
    fn failed_emission_keeps_the_local_change() -> anyhow::Result<()> {
        let storage = GameStorage::new(Arc::new(MemoryStore::new()));
        let mut guest = Game::new(2, None, GameMode::HighScore).with_storage(storage.clone());
        guest.attach_session(
            SharingState::Guest {
                session_id: "room".into(),
            },
            Arc::new(FailingSink),
        )?;

        let id = guest.create_player(Some("Zed"))?;
        guest.add_score_line(&[5])?;
        assert_eq!(guest.player(id).map(Player::scores), Some(&[5][..]));
        assert_eq!(storage.load_game(2)?.expect("saved").players.len(), 1);
        Ok(())
    }

    #[test]
    fn muted_updates_do_not_emit() {
        let sink = Arc::new(RecordingSink::default());
        let mut guest = alice_and_bob();
        guest
            .attach_session(
                SharingState::Guest {
                    session_id: "room".into(),
                },
                sink.clone(),
            )
            .unwrap();
        guest.without_network(|game| game.add_score_line(&[1, 2])).unwrap();
        assert!(sink.actions.lock().is_empty());
        guest.add_score_line(&[0, 0]).unwrap();
        assert_eq!(sink.actions.lock().len(), 1);
    }

    #[test]
    fn documents_with_ragged_columns_are_rejected() {
        let mut document = alice_and_bob().to_document();
        document.players[0].scores_mut().push(3);
        assert!(matches!(
            Game::from_document(document, None),
            Err(PacketError::InvalidValue { key: "players", .. })
        ));
    }
}
