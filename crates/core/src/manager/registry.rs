use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use super::GameManager;
use crate::{
    error::Result,
    models::GameId,
    save::{sanitize_component, DocumentStore, FileStore},
};

/// A manager shared between the UI and the synchronisation engine.
///
/// Every mutation of a game happens while holding this lock.
pub type SharedGameManager = Arc<Mutex<GameManager>>;

/// Opaque handle naming one storage scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope(String);

impl Scope {
    /// Scope named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the scope.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

type StoreFactory = dyn Fn(&Scope) -> Arc<dyn DocumentStore> + Send + Sync;

/// One [`GameManager`] per scope, created on first use.
pub struct ManagerRegistry {
    instances: Mutex<HashMap<Scope, SharedGameManager>>,
    stores: Box<StoreFactory>,
}

impl fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("scopes", &self.instances.lock().len())
            .finish_non_exhaustive()
    }
}

impl ManagerRegistry {
    /// Registry whose managers store their documents in the store `stores`
    /// returns for their scope.
    pub fn new(stores: impl Fn(&Scope) -> Arc<dyn DocumentStore> + Send + Sync + 'static) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            stores: Box::new(stores),
        }
    }

    /// Registry storing each scope in its own directory below `root`.
    ///
    /// Scope names are reduced to `[A-Za-z0-9_-]` to form the directory name.
    pub fn file_backed(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(move |scope| {
            let dir = root.join(sanitize_component(scope.as_str()));
            Arc::new(FileStore::new(dir)) as Arc<dyn DocumentStore>
        })
    }

    /// Manager for `scope`, restoring it from storage on first use.
    pub fn get(&self, scope: &Scope) -> Result<SharedGameManager> {
        let mut instances = self.instances.lock();
        if let Some(manager) = instances.get(scope) {
            return Ok(manager.clone());
        }
        debug!(scope = scope.as_str(), "creating game manager");
        let manager = Arc::new(Mutex::new(GameManager::new((self.stores)(scope))?));
        instances.insert(scope.clone(), manager.clone());
        Ok(manager)
    }

    /// Forget the manager of `scope`; the next [`get`](Self::get) restores a
    /// fresh one. Returns the id of the game that was active, if any.
    pub fn reset(&self, scope: &Scope) -> Option<GameId> {
        let manager = self.instances.lock().remove(scope)?;
        let active = manager.lock().currently_active_game().map(|game| game.id());
        debug!(scope = scope.as_str(), ?active, "game manager reset");
        active
    }
}
