//! Host/guest synchronisation of shared games.
//!
//! The host owns the authoritative state and rebroadcasts it in full after
//! every change. Guests send single actions, which the host replays on top of
//! the last state it transmitted.

mod engine;
mod loopback;
mod reconcile;
mod transport;

pub use engine::{validate_session_code, SyncConfig, SyncEngine};
pub use loopback::LoopbackHub;
pub use reconcile::{GuestUpdate, Reconciler, ReplayReport};
pub use transport::{Transport, TransportEvent, TransportFactory, User};
