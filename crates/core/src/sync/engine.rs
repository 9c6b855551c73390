use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use super::{
    reconcile::{GuestUpdate, Reconciler},
    transport::{Transport, TransportEvent, TransportFactory, User},
};
use crate::{
    config::{AppConfig, DEFAULT_MAX_ROOM_SIZE},
    error::{Result, ScoreboardError},
    manager::SharedGameManager,
    models::{Game, GameId, SharingState},
    network::{snapshot, NetworkAction, NetworkSink},
};

static SESSION_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z_-]{1,64}$").expect("invalid session code regex"));

/// Networking settings taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Fixed user name; a generated one is stored and reused when `None`.
    pub user_name: Option<String>,
    /// Participant limit of hosted sessions.
    pub max_room_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_name: None,
            max_room_size: DEFAULT_MAX_ROOM_SIZE,
        }
    }
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_name: config.user_name.clone(),
            max_room_size: config.max_room_size,
        }
    }
}

/// Check and normalise a session code entered by the user.
pub fn validate_session_code(code: &str) -> Result<&str> {
    let code = code.trim();
    if SESSION_CODE.is_match(code) {
        Ok(code)
    } else {
        Err(ScoreboardError::InvalidSessionCode(code.to_string()))
    }
}

type Sessions = Arc<Mutex<HashMap<GameId, Arc<GameSession>>>>;

/// Shares the games of one [`GameManager`](crate::manager::GameManager).
///
/// Each shared game owns a transport client and a worker task that applies
/// inbound events while holding the manager lock.
pub struct SyncEngine {
    manager: SharedGameManager,
    factory: Arc<dyn TransportFactory>,
    config: SyncConfig,
    sessions: Sessions,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("sessions", &self.sessions.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Engine sharing the games of `manager` through `factory` clients.
    pub fn new(
        manager: SharedGameManager,
        factory: Arc<dyn TransportFactory>,
        config: SyncConfig,
    ) -> Self {
        Self {
            manager,
            factory,
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Manager whose games this engine shares.
    pub fn manager(&self) -> &SharedGameManager {
        &self.manager
    }

    /// Open a session hosted by this device for game `game_id`.
    ///
    /// Returns the session code guests use to join.
    pub async fn start_sharing(&self, game_id: GameId) -> Result<String> {
        {
            let manager = self.manager.lock();
            let game = manager
                .game(game_id)
                .ok_or(ScoreboardError::UnknownGame(game_id))?;
            if game.is_shared() {
                return Err(ScoreboardError::AlreadyShared(game_id));
            }
        }

        let session = self.open_session(game_id);
        let result = self.host(&session).await;
        if result.is_err() {
            self.close_session(&session);
        }
        result
    }

    async fn host(&self, session: &Arc<GameSession>) -> Result<String> {
        session.connect().await?;
        let user_name = self.user_name()?;
        let room_id = session
            .transport
            .create_room(&user_name, self.config.max_room_size)
            .await
            .map_err(|_| ScoreboardError::SessionUnavailable("room was not created".into()))?;

        let mut manager = self.manager.lock();
        let game = manager
            .game_mut(session.game_id)
            .ok_or(ScoreboardError::UnknownGame(session.game_id))?;
        let sharing = SharingState::Host {
            session_id: room_id.clone(),
        };
        game.attach_session(sharing, session.clone())?;
        info!(game_id = session.game_id, room = %room_id, "hosting shared game");
        Ok(room_id)
    }

    /// Join the session `session_code` as a guest.
    ///
    /// The shared game is stored as a new local game whose content is
    /// replaced by the host's state as it arrives. No game is left behind
    /// when joining fails.
    pub async fn join_session(&self, session_code: &str) -> Result<GameId> {
        let code = validate_session_code(session_code)?.to_string();
        let game_id = self.manager.lock().insert_game(None)?;

        let session = self.open_session(game_id);
        match self.join(&session, &code).await {
            Ok(()) => {
                info!(game_id, room = %code, "joined shared game");
                Ok(game_id)
            }
            Err(err) => {
                self.close_session(&session);
                if let Err(cleanup) = self.manager.lock().delete_game(game_id) {
                    warn!(game_id, %cleanup, "could not remove game of failed join");
                }
                Err(err)
            }
        }
    }

    async fn join(&self, session: &Arc<GameSession>, code: &str) -> Result<()> {
        session.connect().await?;
        let user_name = self.user_name()?;
        {
            // attach first so the initial state is not dropped by the worker
            let mut manager = self.manager.lock();
            let game = manager
                .game_mut(session.game_id)
                .ok_or(ScoreboardError::UnknownGame(session.game_id))?;
            let sharing = SharingState::Guest {
                session_id: code.to_string(),
            };
            game.attach_session(sharing, session.clone())?;
        }
        session
            .transport
            .join_room(&user_name, code)
            .await
            .map_err(|_| ScoreboardError::SessionUnavailable(format!("cannot join {code}")))?;
        Ok(())
    }

    /// Leave the session of game `game_id`. A host closes the session for
    /// its guests, who keep their copies as unshared games.
    ///
    /// Calling it again, or for a game that is not shared, has no effect.
    pub fn stop_sharing(&self, game_id: GameId) -> Result<()> {
        let session = self.sessions.lock().remove(&game_id);
        let mut manager = self.manager.lock();
        let game = manager.game_mut(game_id);
        match session {
            Some(session) => {
                leave_session(game, &session)?;
                info!(game_id, "stopped sharing");
            }
            None => {
                if let Some(game) = game {
                    game.detach_session()?;
                }
            }
        }
        Ok(())
    }

    /// Leave every session opened by this engine.
    pub fn release_all(&self) {
        let sessions: Vec<_> = self.sessions.lock().drain().collect();
        let mut manager = self.manager.lock();
        for (game_id, session) in sessions {
            if let Err(err) = leave_session(manager.game_mut(game_id), &session) {
                warn!(game_id, %err, "could not leave shared session");
            }
        }
    }

    /// Users currently in the session of game `game_id`.
    pub fn connected_users(&self, game_id: GameId) -> Vec<User> {
        self.sessions
            .lock()
            .get(&game_id)
            .map(|session| session.users.lock().clone())
            .unwrap_or_default()
    }

    /// Whether game `game_id` has a live session.
    pub fn is_active(&self, game_id: GameId) -> bool {
        self.sessions.lock().contains_key(&game_id)
    }

    fn user_name(&self) -> Result<String> {
        if let Some(name) = &self.config.user_name {
            return Ok(name.clone());
        }
        let storage = self.manager.lock().storage().clone();
        Ok(storage.user_name_or_insert_with(|| format!("{:08x}", rand::random::<u32>()))?)
    }

    fn open_session(&self, game_id: GameId) -> Arc<GameSession> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(&game_id) {
            return session.clone();
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Arc::new(GameSession::new(game_id, self.factory.connect(events_tx)));
        sessions.insert(game_id, session.clone());
        tokio::spawn(run_worker(
            self.manager.clone(),
            self.sessions.clone(),
            session.clone(),
            events_rx,
        ));
        debug!(game_id, "session opened");
        session
    }

    fn close_session(&self, session: &Arc<GameSession>) {
        {
            let mut sessions = self.sessions.lock();
            if sessions
                .get(&session.game_id)
                .is_some_and(|current| Arc::ptr_eq(current, session))
            {
                sessions.remove(&session.game_id);
            }
        }
        let mut manager = self.manager.lock();
        if let Err(err) = leave_session(manager.game_mut(session.game_id), session) {
            warn!(game_id = session.game_id, %err, "could not leave shared session");
        }
    }
}

/// Dropping the engine releases every session. Games are only marked
/// unshared when the manager lock is free; otherwise they keep their role
/// with a released connection.
impl Drop for SyncEngine {
    fn drop(&mut self) {
        let sessions: Vec<_> = self.sessions.lock().drain().collect();
        let mut manager = self.manager.try_lock();
        for (game_id, session) in sessions {
            let game = manager.as_mut().and_then(|manager| manager.game_mut(game_id));
            if let Err(err) = leave_session(game, &session) {
                warn!(game_id, %err, "could not leave shared session");
            }
        }
    }
}

/// Close the session for guests when hosting, unshare `game` and release
/// the connection.
fn leave_session(game: Option<&mut Game>, session: &GameSession) -> Result<()> {
    if let Some(game) = game {
        if game.is_host() == Some(true) {
            if let Err(err) = session.close_for_guests(game.id()) {
                warn!(game_id = game.id(), %err, "could not close session for guests");
            }
        }
        game.detach_session()?;
    }
    session.release();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

async fn run_worker(
    manager: SharedGameManager,
    sessions: Sessions,
    session: Arc<GameSession>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    loop {
        tokio::select! {
            _ = session.shutdown.notified() => break,
            event = events.recv() => match event {
                Some(event) => {
                    if session.handle_event(&manager, event) == Flow::Stop {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    {
        let mut sessions = sessions.lock();
        if sessions
            .get(&session.game_id)
            .is_some_and(|current| Arc::ptr_eq(current, &session))
        {
            sessions.remove(&session.game_id);
        }
    }
    session.release();
    debug!(game_id = session.game_id, "session worker finished");
}

/// Transport client and reconciliation state of one shared game.
struct GameSession {
    game_id: GameId,
    transport: Arc<dyn Transport>,
    reconciler: Mutex<Reconciler>,
    users: Mutex<Vec<User>>,
    next_packet: AtomicU64,
    released: AtomicBool,
    shutdown: Notify,
}

impl GameSession {
    fn new(game_id: GameId, transport: Arc<dyn Transport>) -> Self {
        Self {
            game_id,
            transport,
            reconciler: Mutex::new(Reconciler::new()),
            users: Mutex::new(Vec::new()),
            next_packet: AtomicU64::new(0),
            released: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    async fn connect(&self) -> Result<String> {
        if let Some(id) = self.transport.connection_id() {
            return Ok(id);
        }
        self.transport
            .request_connection_id()
            .await
            .map_err(|_| ScoreboardError::SessionUnavailable("no connection id assigned".into()))
    }

    /// Publish the final state that turns guests back to unshared.
    fn close_for_guests(&self, game_id: GameId) -> Result<()> {
        let state = snapshot::deleted_game_data(game_id, &self.connection_id()?);
        self.transport.update_game_state(state, Vec::new())
    }

    fn connection_id(&self) -> Result<String> {
        self.transport
            .connection_id()
            .ok_or(ScoreboardError::NotConnected)
    }

    fn handle_event(&self, manager: &SharedGameManager, event: TransportEvent) -> Flow {
        let mut manager = manager.lock();
        let Some(game) = manager.game_mut(self.game_id) else {
            debug!(game_id = self.game_id, "shared game is gone");
            return Flow::Stop;
        };

        match event {
            TransportEvent::ConnectedUsersChanged(users) => {
                debug!(game_id = self.game_id, users = users.len(), "connected users changed");
                *self.users.lock() = users;
            }
            TransportEvent::GameStateChanged(state) => {
                let outcome = self.reconciler.lock().apply_game_state(game, &state);
                match outcome {
                    Ok(GuestUpdate::Updated) => {
                        debug!(game_id = self.game_id, "game state received")
                    }
                    Ok(GuestUpdate::Ignored) => {}
                    Ok(GuestUpdate::SessionClosed) => {
                        info!(game_id = self.game_id, "host closed the shared game");
                        if let Err(err) = game.detach_session() {
                            warn!(game_id = self.game_id, %err, "could not leave shared session");
                        }
                        return Flow::Stop;
                    }
                    Err(err) => warn!(game_id = self.game_id, %err, "ignoring game state"),
                }
            }
            TransportEvent::DataToBeSentToHostChanged(pending) => {
                if pending.is_empty() {
                    return Flow::Continue;
                }
                let connection_id = match self.connection_id() {
                    Ok(id) => id,
                    Err(err) => {
                        warn!(game_id = self.game_id, %err, "cannot reconcile guest data");
                        return Flow::Continue;
                    }
                };
                let replayed =
                    self.reconciler
                        .lock()
                        .replay_contributions(game, &pending, &connection_id);
                match replayed {
                    Ok(Some(report)) => {
                        info!(
                            game_id = self.game_id,
                            applied = report.applied,
                            skipped = report.skipped,
                            "guest contributions reconciled"
                        );
                        if let Err(err) =
                            self.transport.update_game_state(report.state, report.processed)
                        {
                            warn!(game_id = self.game_id, %err, "could not publish game state");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!(game_id = self.game_id, %err, "reconciliation failed"),
                }
            }
        }
        Flow::Continue
    }
}

impl NetworkSink for GameSession {
    fn broadcast_state(&self, game: &Game) -> Result<()> {
        let state = snapshot::to_game_data(game, &self.connection_id()?)?;
        self.reconciler.lock().remember(state.clone());
        self.transport.update_game_state(state, Vec::new())
    }

    fn send_action(&self, _game: &Game, action: NetworkAction) -> Result<()> {
        let connection_id = self.connection_id()?;
        let sequence = self.next_packet.fetch_add(1, Ordering::Relaxed);
        let packet = action
            .to_game_data(&connection_id)
            .with_packet_id(format!("{connection_id}-{sequence}"));
        self.transport.send_data_to_host(vec![packet])
    }

    fn game_deleted(&self, game: &Game) -> Result<()> {
        if game.is_host() != Some(true) {
            return Ok(());
        }
        self.close_for_guests(game.id())
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.disconnect();
        self.shutdown.notify_one();
        debug!(game_id = self.game_id, "session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        manager::GameManager,
        network::GameData,
        save::MemoryStore,
        sync::LoopbackHub,
    };
    use std::time::Duration;

    fn engine(hub: &LoopbackHub, user_name: Option<&str>) -> SyncEngine {
        let manager = GameManager::new(Arc::new(MemoryStore::new())).unwrap();
        let config = SyncConfig {
            user_name: user_name.map(str::to_string),
            ..SyncConfig::default()
        };
        SyncEngine::new(
            Arc::new(Mutex::new(manager)),
            Arc::new(hub.clone()),
            config,
        )
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition was not reached");
    }

    fn players_of(engine: &SyncEngine, game_id: GameId) -> Vec<crate::models::Player> {
        engine
            .manager()
            .lock()
            .game(game_id)
            .map(|game| game.players().to_vec())
            .unwrap_or_default()
    }

    async fn shared_pair(
        hub: &LoopbackHub,
        players: &[&str],
    ) -> anyhow::Result<(SyncEngine, GameId, SyncEngine, GameId, String)> {
        let host = engine(hub, Some("host"));
        let guest = engine(hub, Some("guest"));
        let host_game = {
            let mut manager = host.manager().lock();
            let game = manager.create_game(Some("Shared"))?;
            for name in players {
                game.create_player(Some(name))?;
            }
            game.id()
        };
        let code = host.start_sharing(host_game).await?;
        let guest_game = guest.join_session(&code).await?;
        let expected = players.len();
        eventually(|| {
            guest.manager().lock().game(guest_game).is_some_and(|game| {
                game.name() == "Shared" && game.players().len() == expected
            })
        })
        .await;
        Ok((host, host_game, guest, guest_game, code))
    }

    #[test]
    fn session_codes_are_validated() {
        assert_eq!(validate_session_code(" a1-B_2 ").unwrap(), "a1-B_2");
        for code in ["", "with space", "semi;colon", "x".repeat(65).as_str()] {
            assert!(matches!(
                validate_session_code(code),
                Err(ScoreboardError::InvalidSessionCode(_))
            ));
        }
    }

    #[tokio::test]
    async fn guest_player_is_reconciled_by_the_host() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, guest, guest_game, code) = shared_pair(&hub, &[]).await?;

        guest
            .manager()
            .lock()
            .game_mut(guest_game)
            .expect("joined game")
            .create_player(Some("Carol"))?;

        eventually(|| players_of(&host, host_game).len() == 1).await;
        {
            let manager = host.manager().lock();
            let game = manager.game(host_game).expect("hosted game");
            let carol = &game.players()[0];
            assert_eq!((carol.id(), carol.name()), (0, Some("Carol")));
            assert_eq!(carol.scores().len(), game.score_count());
        }
        eventually(|| players_of(&guest, guest_game) == players_of(&host, host_game)).await;
        assert!(hub.pending_for_host(&code).is_empty());
        assert_eq!(host.connected_users(host_game).len(), 2);
        assert_eq!(
            guest.manager().lock().game(guest_game).and_then(Game::is_host),
            Some(false)
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_edits_converge() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, guest, guest_game, _) = shared_pair(&hub, &["Alice", "Bob"]).await?;

        guest
            .manager()
            .lock()
            .game_mut(guest_game)
            .expect("joined game")
            .add_score_line(&[1, 2])?;
        host.manager()
            .lock()
            .game_mut(host_game)
            .expect("hosted game")
            .add_score_line(&[10, 20])?;

        eventually(|| {
            let players = players_of(&host, host_game);
            players[0].scores().len() == 2 && players == players_of(&guest, guest_game)
        })
        .await;
        let mut totals: Vec<_> = players_of(&host, host_game)
            .iter()
            .map(|player| player.total_score())
            .collect();
        totals.sort();
        assert_eq!(totals, vec![11, 22]);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_contributions_do_not_block_others() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, _guest, _, code) = shared_pair(&hub, &["Alice"]).await?;

        let (tx, _rx) = mpsc::unbounded_channel();
        let intruder = hub.connect(tx);
        let connection_id = intruder.request_connection_id().await?;
        intruder.join_room("intruder", &code).await?;

        let mut unknown = GameData::new(connection_id.clone());
        unknown.insert("actionName", "Teleport");
        let wrong_width = NetworkAction::ScoreLineAdded { scores: vec![1, 2, 3] }
            .to_game_data(&connection_id);
        let good = NetworkAction::PlayerAdded {
            player_id: 5,
            player_name: Some("Eve".into()),
        }
        .to_game_data(&connection_id);
        intruder.send_data_to_host(vec![unknown, wrong_width, good])?;

        eventually(|| players_of(&host, host_game).len() == 2).await;
        assert_eq!(players_of(&host, host_game)[1].name(), Some("Eve"));
        eventually(|| hub.pending_for_host(&code).is_empty()).await;
        Ok(())
    }

    #[tokio::test]
    async fn host_deletion_unshares_the_guest_copy() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, guest, guest_game, _) = shared_pair(&hub, &["Alice"]).await?;

        assert!(host.manager().lock().delete_game(host_game)?);

        eventually(|| {
            guest
                .manager()
                .lock()
                .game(guest_game)
                .is_some_and(|game| !game.is_shared())
        })
        .await;
        eventually(|| !guest.is_active(guest_game) && !host.is_active(host_game)).await;
        assert_eq!(players_of(&guest, guest_game).len(), 1);
        assert_eq!(hub.room_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn stop_sharing_is_idempotent() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let host = engine(&hub, Some("host"));
        let game_id = host.manager().lock().create_game(None)?.id();

        host.start_sharing(game_id).await?;
        assert!(matches!(
            host.start_sharing(game_id).await,
            Err(ScoreboardError::AlreadyShared(_))
        ));
        host.stop_sharing(game_id)?;
        host.stop_sharing(game_id)?;

        assert!(!host.is_active(game_id));
        assert_eq!(hub.disconnect_count(), 1);
        assert_eq!(hub.room_count(), 0);
        assert!(!host.manager().lock().game(game_id).expect("game").is_shared());

        host.start_sharing(game_id).await?;
        assert_eq!(hub.room_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_joins_leave_no_game_behind() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let guest = engine(&hub, None);

        assert!(matches!(
            guest.join_session("not a code").await,
            Err(ScoreboardError::InvalidSessionCode(_))
        ));
        assert!(matches!(
            guest.join_session("abc123").await,
            Err(ScoreboardError::SessionUnavailable(_))
        ));
        assert!(matches!(
            guest.start_sharing(42).await,
            Err(ScoreboardError::UnknownGame(42))
        ));
        assert!(guest.manager().lock().games().is_empty());
        assert_eq!(hub.disconnect_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn generated_user_name_is_remembered() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let engine = engine(&hub, None);
        let first = engine.user_name()?;
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(engine.user_name()?, first);
        Ok(())
    }

    #[tokio::test]
    async fn host_stopping_unshares_the_guest_copy() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, guest, guest_game, _) = shared_pair(&hub, &["Alice"]).await?;

        host.stop_sharing(host_game)?;
        eventually(|| {
            guest
                .manager()
                .lock()
                .game(guest_game)
                .is_some_and(|game| !game.is_shared())
        })
        .await;
        eventually(|| !guest.is_active(guest_game)).await;

        guest
            .manager()
            .lock()
            .game_mut(guest_game)
            .expect("guest copy")
            .create_player(Some("Zed"))?;
        assert_eq!(players_of(&guest, guest_game).len(), 2);
        assert_eq!(players_of(&host, host_game).len(), 1);
        assert!(!host.manager().lock().game(host_game).expect("game").is_shared());
        Ok(())
    }

    #[tokio::test]
    async fn guest_deleting_its_copy_only_leaves() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let (host, host_game, guest, guest_game, code) = shared_pair(&hub, &["Alice"]).await?;
        eventually(|| host.connected_users(host_game).len() == 2).await;
        let before = players_of(&host, host_game);

        assert!(guest.manager().lock().delete_game(guest_game)?);

        eventually(|| !guest.is_active(guest_game)).await;
        eventually(|| host.connected_users(host_game).len() == 1).await;
        assert!(hub.pending_for_host(&code).is_empty());
        assert_eq!(players_of(&host, host_game), before);
        let manager = host.manager().lock();
        let game = manager.game(host_game).expect("hosted game");
        assert_eq!(game.is_host(), Some(true));
        assert_eq!(game.name(), "Shared");
        Ok(())
    }

    #[tokio::test]
    async fn dropping_the_engine_while_the_manager_is_locked() -> anyhow::Result<()> {
        let hub = LoopbackHub::new();
        let host = engine(&hub, Some("host"));
        let game_id = host.manager().lock().create_game(None)?.id();
        host.start_sharing(game_id).await?;

        let manager = host.manager().clone();
        let guard = manager.lock();
        drop(host);
        drop(guard);

        assert_eq!(hub.disconnect_count(), 1);
        assert_eq!(hub.room_count(), 0);
        Ok(())
    }
}
