//! Persistence gateway: keyed JSON documents plus the scoreboard key layout.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{GameDocument, GameId};

/// Directory under the user's data dir used for stored documents.
pub const DEFAULT_DATA_DIR: &str = "scoreboard";

const GAME_LIST_KEY: &str = "games";
const ACTIVE_GAME_KEY: &str = "activeGame";
const USER_NAME_KEY: &str = "networkUserName";

/// Durable key/value storage for structured documents.
pub trait DocumentStore: Send + Sync {
    /// Store `document` under `key`, replacing any previous document.
    fn save(&self, key: &str, document: &Value) -> Result<()>;
    /// Load the document stored under `key`.
    fn load(&self, key: &str) -> Result<Option<Value>>;
    /// Delete the document stored under `key`; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Stores one pretty-printed JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", sanitize_component(key)))
    }
}

impl DocumentStore for FileStore {
    fn save(&self, key: &str, document: &Value) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(document)?;
        fs::write(&path, serialised).with_context(|| format!("failed to write {}", path.display()))
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        let document = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(document))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.documents.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl DocumentStore for MemoryStore {
    fn save(&self, key: &str, document: &Value) -> Result<()> {
        self.documents
            .write()
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.documents.write().remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GameList {
    #[serde(default)]
    ids: Vec<GameId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActiveGame {
    id: Option<GameId>,
}

/// Scoreboard view over a [`DocumentStore`].
#[derive(Clone)]
pub struct GameStorage {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for GameStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStorage").finish_non_exhaustive()
    }
}

impl GameStorage {
    /// Wrap a document store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist a game document, stamping the save time.
    pub fn save_game(&self, document: &GameDocument) -> Result<()> {
        let mut document = document.clone();
        document.saved_at = Some(Utc::now());
        let value = serde_json::to_value(&document).context("failed to serialise game")?;
        self.store.save(&game_key(document.id), &value)?;
        debug!(game_id = document.id, "game saved");
        Ok(())
    }

    /// Load the document of game `id`, if stored.
    pub fn load_game(&self, id: GameId) -> Result<Option<GameDocument>> {
        let Some(value) = self.store.load(&game_key(id))? else {
            return Ok(None);
        };
        let document = serde_json::from_value(value)
            .with_context(|| format!("failed to parse stored game {id}"))?;
        Ok(Some(document))
    }

    /// Delete the document of game `id`.
    pub fn remove_game(&self, id: GameId) -> Result<()> {
        self.store.remove(&game_key(id))
    }

    /// Persist the ordered list of game ids.
    pub fn save_game_ids(&self, ids: &[GameId]) -> Result<()> {
        let value = serde_json::to_value(GameList { ids: ids.to_vec() })?;
        self.store.save(GAME_LIST_KEY, &value)
    }

    /// Ordered list of stored game ids; empty when nothing was stored yet.
    pub fn load_game_ids(&self) -> Result<Vec<GameId>> {
        let Some(value) = self.store.load(GAME_LIST_KEY)? else {
            return Ok(Vec::new());
        };
        let list: GameList =
            serde_json::from_value(value).context("failed to parse stored game list")?;
        Ok(list.ids)
    }

    /// Remember which game was activated last.
    pub fn save_active_game(&self, id: Option<GameId>) -> Result<()> {
        let value = serde_json::to_value(ActiveGame { id })?;
        self.store.save(ACTIVE_GAME_KEY, &value)
    }

    /// Game activated last, if any was recorded.
    pub fn load_active_game(&self) -> Result<Option<GameId>> {
        let Some(value) = self.store.load(ACTIVE_GAME_KEY)? else {
            return Ok(None);
        };
        let active: ActiveGame =
            serde_json::from_value(value).context("failed to parse stored active game")?;
        Ok(active.id)
    }

    /// Network user name stored for this scope, generating and storing one
    /// with `generate` on first use.
    pub fn user_name_or_insert_with(&self, generate: impl FnOnce() -> String) -> Result<String> {
        if let Some(Value::String(name)) = self.store.load(USER_NAME_KEY)? {
            return Ok(name);
        }
        let name = generate();
        self.store.save(USER_NAME_KEY, &Value::String(name.clone()))?;
        Ok(name)
    }
}

fn game_key(id: GameId) -> String {
    format!("game{id}")
}

pub(crate) fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "document".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameMode;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_document(id: GameId) -> GameDocument {
        GameDocument {
            id,
            name: "Sample".to_string(),
            mode: GameMode::LowScore,
            shared_id: None,
            is_host_of_shared_game: None,
            players: Vec::new(),
            saved_at: None,
        }
    }

    #[test]
    fn file_store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("nested"));

        assert!(store.load("missing")?.is_none());
        store.save("game0", &json!({"name": "first"}))?;
        assert!(dir.path().join("nested/game0.json").exists());
        assert_eq!(store.load("game0")?, Some(json!({"name": "first"})));

        store.remove("game0")?;
        store.remove("game0")?;
        assert!(store.load("game0")?.is_none());
        Ok(())
    }

    #[test]
    fn game_storage_layout() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = GameStorage::new(store.clone());

        assert!(storage.load_game_ids()?.is_empty());
        assert_eq!(storage.load_active_game()?, None);

        storage.save_game(&sample_document(3))?;
        storage.save_game_ids(&[3])?;
        storage.save_active_game(Some(3))?;

        assert_eq!(store.keys(), vec!["activeGame", "game3", "games"]);
        let loaded = storage.load_game(3)?.expect("stored game");
        assert_eq!(loaded.name, "Sample");
        assert!(loaded.saved_at.is_some());
        assert_eq!(storage.load_game_ids()?, vec![3]);
        assert_eq!(storage.load_active_game()?, Some(3));

        storage.remove_game(3)?;
        assert!(storage.load_game(3)?.is_none());
        Ok(())
    }

    #[test]
    fn user_name_is_generated_once() -> Result<()> {
        let storage = GameStorage::new(Arc::new(MemoryStore::new()));
        let first = storage.user_name_or_insert_with(|| "abc".to_string())?;
        let second = storage.user_name_or_insert_with(|| "def".to_string())?;
        assert_eq!(first, "abc");
        assert_eq!(second, "abc");
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("../game 1"), "game1");
        assert_eq!(sanitize_component("!!"), "document");
    }
}
