//! Roster of games for one storage scope.

mod registry;

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::{Result, ScoreboardError},
    models::{Game, GameId, GameMode, ListChange, ObservableList},
    save::{DocumentStore, GameStorage},
};

pub use registry::{ManagerRegistry, Scope, SharedGameManager};

/// Owns the games of one storage scope and the active selection.
///
/// Games are kept in creation order. Changes to the roster rewrite the
/// stored id list; each game saves itself on every mutation.
#[derive(Debug)]
pub struct GameManager {
    storage: GameStorage,
    games: ObservableList<Game>,
    active: Option<GameId>,
}

impl GameManager {
    /// Restore the roster stored in `store`.
    ///
    /// Ids whose game document is missing or unreadable are skipped and the
    /// id list is rewritten without them.
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let storage = GameStorage::new(store);
        let ids = storage.load_game_ids()?;
        let mut games = Vec::with_capacity(ids.len());
        for id in &ids {
            match storage.load_game(*id) {
                Ok(Some(document)) => match Game::from_document(document, Some(storage.clone())) {
                    Ok(game) => games.push(game),
                    Err(err) => warn!(game_id = id, %err, "skipping invalid stored game"),
                },
                Ok(None) => warn!(game_id = id, "skipping missing stored game"),
                Err(err) => warn!(game_id = id, "skipping unreadable stored game: {err:#}"),
            }
        }

        let manager = Self {
            storage,
            games: ObservableList::new(games),
            active: None,
        };
        if manager.games.len() != ids.len() {
            manager.save_game_ids()?;
        }
        info!(total = manager.games.len(), "games restored");
        Ok(manager)
    }

    /// Storage the games of this manager are saved to.
    pub fn storage(&self) -> &GameStorage {
        &self.storage
    }

    /// Games in creation order.
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Game `id`, if managed here.
    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.iter().find(|game| game.id() == id)
    }

    /// Mutable access to game `id`.
    pub fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        let index = self.position(id)?;
        self.games.get_mut(index)
    }

    /// Position of game `id` in the roster.
    pub fn position(&self, id: GameId) -> Option<usize> {
        self.games.iter().position(|game| game.id() == id)
    }

    /// Name to show for game `id`, falling back to its roster position.
    pub fn display_name(&self, id: GameId) -> Option<String> {
        let position = self.position(id)?;
        Some(self.games[position].display_name(position).into_owned())
    }

    /// The active game, if one is selected.
    pub fn currently_active_game(&self) -> Option<&Game> {
        self.game(self.active?)
    }

    /// Mutable access to the active game.
    pub fn currently_active_game_mut(&mut self) -> Option<&mut Game> {
        let id = self.active?;
        self.game_mut(id)
    }

    fn next_game_id(&self) -> GameId {
        self.games
            .iter()
            .map(Game::id)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Create and save an unshared game in high-score mode.
    pub fn create_game(&mut self, name: Option<&str>) -> Result<&mut Game> {
        let id = self.next_game_id();
        let game = Game::new(id, name, GameMode::HighScore).with_storage(self.storage.clone());
        game.persist()?;
        let change = self.games.push(game);
        self.on_games_changed(&change)?;
        info!(game_id = id, "game created");
        self.game_mut(id).ok_or(ScoreboardError::UnknownGame(id))
    }

    /// Delete game `id`, returning `false` when it is not part of the roster.
    ///
    /// The active selection is cleared first when it points at the game. A
    /// shared game leaves its session; a host announces the deletion to its
    /// guests before leaving.
    pub fn delete_game(&mut self, id: GameId) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        if self.active == Some(id) {
            self.activate_game(None)?;
        }
        let Some(change) = self.games.remove(index) else {
            return Ok(false);
        };
        self.on_games_changed(&change)?;
        if let ListChange::Removed { mut item, .. } = change {
            if item.is_shared() {
                item.announce_deletion()?;
            }
            item.remove_from_storage()?;
        }
        info!(game_id = id, "game deleted");
        Ok(true)
    }

    /// Make game `id` the active one, or clear the selection with `None`.
    ///
    /// An id that matches no game clears the selection as well. The choice is
    /// stored so that the next start can resume it.
    pub fn activate_game(&mut self, id: Option<GameId>) -> Result<()> {
        let target = id.filter(|id| self.position(*id).is_some());
        if target.is_none() && id.is_some() {
            warn!(game_id = id, "no game with this id, clearing active game");
        }
        if self.active == target {
            return Ok(());
        }
        self.active = target;
        self.storage.save_active_game(target)?;
        info!(game_id = target, "game activated");
        Ok(())
    }

    /// Make sure at least one game exists, then activate the game activated
    /// last, or the first game when that selection is no longer valid.
    pub fn create_game_if_empty_and_activate_the_last_activated_game(&mut self) -> Result<GameId> {
        if self.games.is_empty() {
            self.create_game(None)?;
        }
        let last = self
            .storage
            .load_active_game()?
            .filter(|id| self.position(*id).is_some());
        let id = match last.or_else(|| self.games.first().map(Game::id)) {
            Some(id) => id,
            None => self.create_game(None)?.id(),
        };
        self.activate_game(Some(id))?;
        Ok(id)
    }

    pub(crate) fn insert_game(&mut self, name: Option<&str>) -> Result<GameId> {
        Ok(self.create_game(name)?.id())
    }

    fn on_games_changed(&self, _change: &ListChange<Game>) -> Result<()> {
        self.save_game_ids()
    }

    fn save_game_ids(&self) -> Result<()> {
        let ids: Vec<_> = self.games.iter().map(Game::id).collect();
        self.storage.save_game_ids(&ids)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{FileStore, MemoryStore};
    use tempfile::tempdir;

    fn ids(manager: &GameManager) -> Vec<GameId> {
        manager.games().iter().map(Game::id).collect()
    }

    #[test]
    fn empty_store_gives_empty_roster() -> anyhow::Result<()> {
        let manager = GameManager::new(Arc::new(MemoryStore::new()))?;
        assert!(manager.games().is_empty());
        assert!(manager.currently_active_game().is_none());
        Ok(())
    }

    #[test]
    fn games_survive_a_restart() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(dir.path()));

        let mut manager = GameManager::new(store.clone())?;
        let game = manager.create_game(Some("game1"))?;
        let first = game.id();
        game.create_player(Some("Alice"))?;
        game.add_score_line(&[42])?;
        let second = manager.create_game(None)?.id();
        assert_eq!((first, second), (0, 1));

        let restored = GameManager::new(store)?;
        assert_eq!(ids(&restored), vec![0, 1]);
        let game = restored.game(first).expect("restored game");
        assert_eq!(game.name(), "game1");
        assert_eq!(game.players()[0].scores(), &[42]);
        assert_eq!(restored.display_name(second).as_deref(), Some("Game 2"));
        Ok(())
    }

    #[test]
    fn game_ids_follow_the_highest_id() -> anyhow::Result<()> {
        let mut manager = GameManager::new(Arc::new(MemoryStore::new()))?;
        for _ in 0..3 {
            manager.create_game(None)?;
        }
        assert!(manager.delete_game(1)?);
        assert_eq!(manager.create_game(None)?.id(), 3);
        assert!(manager.delete_game(3)?);
        assert_eq!(manager.create_game(None)?.id(), 3);
        Ok(())
    }

    #[test]
    fn activation_by_id() -> anyhow::Result<()> {
        let mut manager = GameManager::new(Arc::new(MemoryStore::new()))?;
        let id = manager.create_game(Some("game1"))?.id();
        assert!(manager.currently_active_game().is_none());

        manager.activate_game(Some(id))?;
        assert_eq!(manager.currently_active_game().map(Game::id), Some(id));

        manager.activate_game(Some(99))?;
        assert!(manager.currently_active_game().is_none());
        Ok(())
    }

    #[test]
    fn create_if_empty_creates_one_game() -> anyhow::Result<()> {
        let mut manager = GameManager::new(Arc::new(MemoryStore::new()))?;
        let id = manager.create_game_if_empty_and_activate_the_last_activated_game()?;
        assert_eq!(ids(&manager), vec![id]);
        assert_eq!(manager.currently_active_game().map(Game::id), Some(id));
        Ok(())
    }

    #[test]
    fn create_if_empty_resumes_the_last_active_game() -> anyhow::Result<()> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut manager = GameManager::new(store.clone())?;
        manager.create_game(Some("first"))?;
        let second = manager.create_game(Some("second"))?.id();
        manager.activate_game(Some(second))?;

        let mut restored = GameManager::new(store.clone())?;
        assert!(restored.currently_active_game().is_none());
        let id = restored.create_game_if_empty_and_activate_the_last_activated_game()?;
        assert_eq!(id, second);
        assert_eq!(ids(&restored), vec![0, 1]);

        restored.delete_game(second)?;
        let mut restored = GameManager::new(store)?;
        let id = restored.create_game_if_empty_and_activate_the_last_activated_game()?;
        assert_eq!(id, 0);
        Ok(())
    }

    #[test]
    fn deleting_games() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut manager = GameManager::new(store.clone())?;
        assert!(!manager.delete_game(1)?);

        let inactive = manager.create_game(Some("inactive"))?.id();
        assert!(manager.delete_game(inactive)?);
        assert!(manager.games().is_empty());

        let active = manager.create_game(Some("active"))?.id();
        manager.activate_game(Some(active))?;
        assert!(manager.delete_game(active)?);
        assert!(manager.games().is_empty());
        assert!(manager.currently_active_game().is_none());
        assert!(!store.keys().iter().any(|key| key.starts_with("game0")));
        Ok(())
    }

    #[test]
    fn missing_documents_are_skipped_on_restore() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = GameStorage::new(store.clone());
        let mut manager = GameManager::new(store.clone())?;
        manager.create_game(Some("kept"))?;
        manager.create_game(Some("lost"))?;
        storage.remove_game(1)?;

        let restored = GameManager::new(store)?;
        assert_eq!(ids(&restored), vec![0]);
        assert_eq!(storage.load_game_ids()?, vec![0]);
        Ok(())
    }
}
