//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::info;

use crate::save::FileStore;

/// Room size requested when hosting a shared game.
pub const DEFAULT_MAX_ROOM_SIZE: u32 = 1000;

const CONFIG_DIR: &str = "scoreboard";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "SCOREBOARD";

const DEFAULT_CONFIG: &str = r#"# Scoreboard configuration.
#
# Every key can be overridden with an environment variable prefixed with
# SCOREBOARD_, for example SCOREBOARD_USER_NAME=alice.

# Directory holding the stored games.
# data_root = "/path/to/scoreboard"

# Name announced to the other participants of a shared game. A random name is
# generated and remembered when unset.
# user_name = "alice"

# Maximum number of participants in a hosted game.
max_room_size = 1000
"#;

/// Settings read from the config file and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Directory holding the stored games.
    pub data_root: PathBuf,
    /// Name announced in shared sessions.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Participant limit of hosted sessions.
    pub max_room_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: FileStore::default_root(),
            user_name: None,
            max_room_size: DEFAULT_MAX_ROOM_SIZE,
        }
    }
}

impl AppConfig {
    /// Load from the default config file, then `SCOREBOARD_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path`, which may be missing, then `SCOREBOARD_*` variables.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let config = Config::builder()
            .set_default("data_root", defaults.data_root.to_string_lossy().into_owned())?
            .set_default("max_room_size", i64::from(defaults.max_room_size))?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let mut loaded: Self = config
            .try_deserialize()
            .context("invalid configuration")?;
        loaded.user_name = loaded
            .user_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(loaded)
    }
}

/// Location of the config file under the user's config directory.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write the commented default config file unless one exists.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_is_written_once_and_loads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        assert!(path.exists());

        fs::write(&path, "max_room_size = 4\nuser_name = \"  carol \"\n")?;
        write_default_config(&path)?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.max_room_size, 4);
        assert_eq!(config.user_name.as_deref(), Some("carol"));
        assert_eq!(config.data_root, FileStore::default_root());
        Ok(())
    }

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join(CONFIG_FILE))?;
        assert_eq!(config.max_room_size, DEFAULT_MAX_ROOM_SIZE);
        assert_eq!(config.user_name, None);
        Ok(())
    }

    #[test]
    fn generated_default_file_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        write_default_config(&path)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.max_room_size, DEFAULT_MAX_ROOM_SIZE);
        Ok(())
    }
}
