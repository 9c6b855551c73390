use anyhow::{bail, Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use scoreboard_core::{
    config::{self, AppConfig},
    DocumentStore, FileStore, GameId, GameManager, LoopbackHub, SharedGameManager, SyncConfig,
    SyncEngine,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(data_root = %config.data_root.display(), "configuration loaded");

    let hub = LoopbackHub::new();
    let host = open_engine(&config, "host", &hub)?;
    let guest = open_engine(&config, "guest", &hub)?;

    let host_game = {
        let mut manager = host.manager().lock();
        let game = manager.create_game(Some("Loopback session"))?;
        game.create_player(Some("Alice"))?;
        game.create_player(Some("Bob"))?;
        let id = game.id();
        manager.activate_game(Some(id))?;
        id
    };

    let code = host.start_sharing(host_game).await?;
    info!(%code, "session opened");
    let guest_game = guest.join_session(&code).await?;
    wait_for(guest.manager(), guest_game, 2).await?;

    {
        let mut manager = guest.manager().lock();
        let game = manager
            .game_mut(guest_game)
            .context("joined game disappeared")?;
        game.create_player(Some("Carol"))?;
    }
    wait_for(host.manager(), host_game, 3).await?;
    wait_for(guest.manager(), guest_game, 3).await?;

    host.manager()
        .lock()
        .game_mut(host_game)
        .context("hosted game disappeared")?
        .add_score_line(&[12, 7, 9])?;
    guest
        .manager()
        .lock()
        .game_mut(guest_game)
        .context("joined game disappeared")?
        .add_score_line(&[3, 11, 4])?;
    wait_for_lines(host.manager(), host_game, 2).await?;
    wait_for_lines(guest.manager(), guest_game, 2).await?;

    log_ranking("host", host.manager(), host_game);
    log_ranking("guest", guest.manager(), guest_game);
    info!(users = host.connected_users(host_game).len(), "connected users");

    // the scripted games are not kept between runs
    guest.manager().lock().delete_game(guest_game)?;
    host.manager().lock().delete_game(host_game)?;
    host.release_all();
    guest.release_all();
    Ok(())
}

fn open_engine(config: &AppConfig, scope: &str, hub: &LoopbackHub) -> Result<SyncEngine> {
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(config.data_root.join(scope)));
    let manager = Arc::new(Mutex::new(GameManager::new(store)?));
    Ok(SyncEngine::new(
        manager,
        Arc::new(hub.clone()),
        SyncConfig {
            user_name: config.user_name.clone().or_else(|| Some(scope.to_string())),
            max_room_size: config.max_room_size,
        },
    ))
}

async fn wait_for(manager: &SharedGameManager, game_id: GameId, players: usize) -> Result<()> {
    wait_until(manager, game_id, |game| game.players().len() == players).await
}

async fn wait_for_lines(manager: &SharedGameManager, game_id: GameId, lines: usize) -> Result<()> {
    wait_until(manager, game_id, |game| game.score_count() == lines).await
}

async fn wait_until(
    manager: &SharedGameManager,
    game_id: GameId,
    done: impl Fn(&scoreboard_core::Game) -> bool,
) -> Result<()> {
    for _ in 0..100 {
        if manager.lock().game(game_id).is_some_and(&done) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("game {game_id} did not reach the expected state")
}

fn log_ranking(role: &str, manager: &SharedGameManager, game_id: GameId) {
    let manager = manager.lock();
    let Some(game) = manager.game(game_id) else {
        return;
    };
    for (rank, (player, total)) in game.ranking().into_iter().enumerate() {
        let position = game.player_index(player.id()).unwrap_or(rank);
        info!(
            role,
            rank = rank + 1,
            player = %player.display_name(position),
            total,
            "ranking"
        );
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("scoreboard-loopback.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
