//! Live connection state: node sessions and admin listeners.

pub mod connection;
pub mod roster;
pub mod session;

pub use connection::{ConnId, FrameSink, PeerConnection, TransportError};
pub use roster::AdminRoster;
pub use session::{NodeSession, SessionRegistry};
