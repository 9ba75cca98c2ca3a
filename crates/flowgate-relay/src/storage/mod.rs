//! SQLite storage for the flowgate relay.
//!
//! Provides node lookups and status writes for the connection lifecycle, and
//! the transactional flow ledger that traffic reports are applied through.

mod db;
mod ledger;
mod models;
mod queries;


pub use db::RelayDatabase;
pub use flowgate_core::db::DatabaseError;
pub use ledger::{FlowDelta, LedgerError};
pub use models::*;
