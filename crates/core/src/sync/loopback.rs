//! In-process matchmaking service.
//!
//! Rooms live in memory and every client of one hub sees the same rooms, so
//! several game managers in one process can share games with each other.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use super::transport::{Transport, TransportEvent, TransportFactory, User};
use crate::{
    error::{Result, ScoreboardError},
    network::GameData,
};

#[derive(Debug)]
struct Room {
    host: String,
    max_size: u32,
    users: Vec<User>,
    game_state: Option<GameData>,
    data_to_host: Vec<GameData>,
}

#[derive(Debug, Default)]
struct HubState {
    next_connection: u64,
    clients: HashMap<String, mpsc::UnboundedSender<TransportEvent>>,
    rooms: HashMap<String, Room>,
    disconnects: usize,
}

impl HubState {
    fn send(&self, connection_id: &str, event: TransportEvent) {
        if let Some(client) = self.clients.get(connection_id) {
            // a closed mailbox means the session is shutting down
            let _ = client.send(event);
        }
    }

    fn publish_users(&self, room_id: &str) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        for user in &room.users {
            self.send(
                &user.connection_id,
                TransportEvent::ConnectedUsersChanged(room.users.clone()),
            );
        }
    }

    fn new_room_id(&self) -> String {
        loop {
            let id = format!("{:06x}", rand::random::<u32>() & 0x00ff_ffff);
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Shared in-memory matchmaking service.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    /// Hub without rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open rooms.
    pub fn room_count(&self) -> usize {
        self.state.lock().rooms.len()
    }

    /// Number of clients that disconnected so far.
    pub fn disconnect_count(&self) -> usize {
        self.state.lock().disconnects
    }

    /// Contributions waiting for the host of `room_id`.
    pub fn pending_for_host(&self, room_id: &str) -> Vec<GameData> {
        self.state
            .lock()
            .rooms
            .get(room_id)
            .map(|room| room.data_to_host.clone())
            .unwrap_or_default()
    }
}

impl TransportFactory for LoopbackHub {
    fn connect(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Arc<dyn Transport> {
        Arc::new(LoopbackClient {
            hub: self.state.clone(),
            events,
            connection: Mutex::new(None),
            room: Mutex::new(None),
        })
    }
}

struct LoopbackClient {
    hub: Arc<Mutex<HubState>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    connection: Mutex<Option<String>>,
    room: Mutex<Option<String>>,
}

impl LoopbackClient {
    fn room_id(&self) -> Result<String> {
        self.room
            .lock()
            .clone()
            .ok_or_else(|| ScoreboardError::SessionUnavailable("not in a room".into()))
    }
}

impl Transport for LoopbackClient {
    fn connection_id(&self) -> Option<String> {
        self.connection.lock().clone()
    }

    fn request_connection_id(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let mut connection = self.connection.lock();
        let id = match connection.as_ref() {
            Some(id) => id.clone(),
            None => {
                let mut hub = self.hub.lock();
                hub.next_connection += 1;
                let id = format!("conn-{}", hub.next_connection);
                hub.clients.insert(id.clone(), self.events.clone());
                *connection = Some(id.clone());
                id
            }
        };
        let _ = tx.send(id);
        rx
    }

    fn create_room(&self, user_name: &str, max_room_size: u32) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let Some(connection_id) = self.connection_id() else {
            return rx;
        };
        let mut hub = self.hub.lock();
        let room_id = hub.new_room_id();
        hub.rooms.insert(
            room_id.clone(),
            Room {
                host: connection_id.clone(),
                max_size: max_room_size,
                users: vec![User {
                    connection_id,
                    user_name: user_name.to_string(),
                }],
                game_state: None,
                data_to_host: Vec::new(),
            },
        );
        *self.room.lock() = Some(room_id.clone());
        hub.publish_users(&room_id);
        debug!(room = %room_id, "room created");
        let _ = tx.send(room_id);
        rx
    }

    fn join_room(&self, user_name: &str, room_id: &str) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let Some(connection_id) = self.connection_id() else {
            return rx;
        };
        let mut hub = self.hub.lock();
        let Some(room) = hub.rooms.get_mut(room_id) else {
            debug!(room = %room_id, "no such room");
            return rx;
        };
        if room.users.len() >= room.max_size as usize {
            debug!(room = %room_id, "room is full");
            return rx;
        }
        room.users.push(User {
            connection_id: connection_id.clone(),
            user_name: user_name.to_string(),
        });
        let state = room.game_state.clone();
        *self.room.lock() = Some(room_id.to_string());
        hub.publish_users(room_id);
        if let Some(state) = state {
            hub.send(&connection_id, TransportEvent::GameStateChanged(state));
        }
        let _ = tx.send(room_id.to_string());
        rx
    }

    fn update_game_state(&self, state: GameData, processed: Vec<GameData>) -> Result<()> {
        let connection_id = self.connection_id().ok_or(ScoreboardError::NotConnected)?;
        let room_id = self.room_id()?;
        let mut hub = self.hub.lock();
        let Some(room) = hub.rooms.get_mut(&room_id) else {
            return Err(ScoreboardError::SessionUnavailable(format!("room {room_id} is closed")));
        };
        if room.host != connection_id {
            return Err(ScoreboardError::SessionUnavailable(
                "only the host publishes the game state".into(),
            ));
        }
        room.data_to_host.retain(|packet| !processed.contains(packet));
        room.game_state = Some(state.clone());
        let guests: Vec<String> = room
            .users
            .iter()
            .filter(|user| user.connection_id != room.host)
            .map(|user| user.connection_id.clone())
            .collect();
        trace!(room = %room_id, guests = guests.len(), "game state published");
        for guest in guests {
            hub.send(&guest, TransportEvent::GameStateChanged(state.clone()));
        }
        Ok(())
    }

    fn send_data_to_host(&self, data: Vec<GameData>) -> Result<()> {
        self.connection_id().ok_or(ScoreboardError::NotConnected)?;
        let room_id = self.room_id()?;
        let mut hub = self.hub.lock();
        let Some(room) = hub.rooms.get_mut(&room_id) else {
            return Err(ScoreboardError::SessionUnavailable(format!("room {room_id} is closed")));
        };
        room.data_to_host.extend(data);
        let pending = room.data_to_host.clone();
        let host = room.host.clone();
        hub.send(&host, TransportEvent::DataToBeSentToHostChanged(pending));
        Ok(())
    }

    fn disconnect(&self) {
        let Some(connection_id) = self.connection.lock().take() else {
            return;
        };
        let room_id = self.room.lock().take();
        let mut hub = self.hub.lock();
        hub.disconnects += 1;
        hub.clients.remove(&connection_id);
        if let Some(room_id) = room_id {
            let host_left = hub
                .rooms
                .get(&room_id)
                .is_some_and(|room| room.host == connection_id);
            if host_left {
                hub.rooms.remove(&room_id);
                debug!(room = %room_id, "room closed");
            } else if let Some(room) = hub.rooms.get_mut(&room_id) {
                room.users.retain(|user| user.connection_id != connection_id);
                hub.publish_users(&room_id);
            }
        }
        debug!(connection = %connection_id, "disconnected");
    }
}
