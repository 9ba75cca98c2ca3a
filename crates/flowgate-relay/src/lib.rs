//! flowgate Relay Library
//!
//! Control plane for a fleet of proxy nodes:
//! - Session registry with last-connection-wins supersession
//! - Admin roster and broadcast hub for live status and telemetry
//! - Connection lifecycle over WebSockets
//! - SQLite storage and the transactional flow ledger

pub mod auth;
pub mod hub;
pub mod registry;
pub mod server;
pub mod storage;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod test_helpers;
