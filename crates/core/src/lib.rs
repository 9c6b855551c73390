#![warn(clippy::all, missing_docs)]

//! Core of the scoreboard application.
//!
//! This crate hosts the game and player models, the ranking map, the
//! persistence gateway, the network action protocol and the engine that keeps
//! shared games in sync between a host and its guests.

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod network;
pub mod ranking;
pub mod save;
pub mod sync;

pub use config::AppConfig;
pub use error::{PacketError, Result, ScoreboardError};
pub use manager::{GameManager, ManagerRegistry, Scope, SharedGameManager};
pub use models::{Game, GameDocument, GameId, GameMode, Player, PlayerId, SharingState};
pub use network::{GameData, NetworkAction};
pub use ranking::ValueSortedMap;
pub use save::{DocumentStore, FileStore, GameStorage, MemoryStore};
pub use sync::{LoopbackHub, SyncConfig, SyncEngine};
