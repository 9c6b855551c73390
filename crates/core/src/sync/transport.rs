use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::{error::Result, network::GameData};

/// Participant of a room as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Connection the user is reachable on.
    pub connection_id: String,
    /// Name announced when entering the room.
    pub user_name: String,
}

/// Inbound notification delivered to a game's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The set of users in the room changed.
    ConnectedUsersChanged(Vec<User>),
    /// The host published a new game state.
    GameStateChanged(GameData),
    /// Guest contributions waiting for the host, oldest first.
    DataToBeSentToHostChanged(Vec<GameData>),
}

/// Client side of the matchmaking service, one per shared game.
///
/// Requests that complete later hand back a receiver; a dropped sender means
/// the request failed. There is no timeout.
pub trait Transport: Send + Sync {
    /// Id assigned by the service, `None` until connected.
    fn connection_id(&self) -> Option<String>;
    /// Ask the service for a connection id.
    fn request_connection_id(&self) -> oneshot::Receiver<String>;
    /// Open a room hosted by this connection; resolves with the room id.
    fn create_room(&self, user_name: &str, max_room_size: u32) -> oneshot::Receiver<String>;
    /// Enter an existing room as a guest; resolves with the room id.
    fn join_room(&self, user_name: &str, room_id: &str) -> oneshot::Receiver<String>;
    /// Host only: publish `state` and drop the contributions in `processed`.
    fn update_game_state(&self, state: GameData, processed: Vec<GameData>) -> Result<()>;
    /// Guest only: queue packets for the host.
    fn send_data_to_host(&self, data: Vec<GameData>) -> Result<()>;
    /// Leave the room and close the connection.
    fn disconnect(&self);
}

/// Creates a [`Transport`] that pushes its observations into `events`.
pub trait TransportFactory: Send + Sync {
    /// Open a client whose events go to `events`.
    fn connect(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Arc<dyn Transport>;
}
