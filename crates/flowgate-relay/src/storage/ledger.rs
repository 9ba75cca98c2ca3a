//! Flow accounting ledger.
//!
//! A reported traffic delta touches the forward's counters, the owning
//! user's counters and, when the forward runs under a user-tunnel
//! allocation, that allocation's counters. All of them move together in one
//! transaction or none of them move.

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use super::db::RelayDatabase;

/// One reporting interval's traffic for one forward endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowDelta {
    pub forward_id: i64,
    pub user_id: i64,
    /// Zero or `None` means no tunnel-scoped counter is updated.
    pub user_tunnel_id: Option<i64>,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

impl FlowDelta {
    /// The user-tunnel row this delta must also update, if any.
    pub fn tunnel_scope(&self) -> Option<i64> {
        self.user_tunnel_id.filter(|id| *id > 0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid flow delta: {0}")]
    InvalidDelta(String),

    #[error("No {table} row with id {id}")]
    MissingRow { table: &'static str, id: i64 },

    #[error("Ledger transaction failed: {0}")]
    Database(#[from] sqlx::Error),
}

const FORWARD_INCREMENT: &str =
    "UPDATE forward SET in_flow = in_flow + ?, out_flow = out_flow + ? WHERE id = ?";
const USER_INCREMENT: &str =
    "UPDATE user SET in_flow = in_flow + ?, out_flow = out_flow + ? WHERE id = ?";
const USER_TUNNEL_INCREMENT: &str =
    "UPDATE user_tunnel SET in_flow = in_flow + ?, out_flow = out_flow + ? WHERE id = ?";

impl RelayDatabase {
    /// Apply `delta` atomically and return the number of rows updated.
    ///
    /// On any error the transaction is dropped uncommitted, which rolls back
    /// every increment already issued, and the first error is returned.
    pub async fn apply_flow_delta(&self, delta: &FlowDelta) -> Result<u64, LedgerError> {
        let in_bytes = to_counter(delta.in_bytes, "in_bytes")?;
        let out_bytes = to_counter(delta.out_bytes, "out_bytes")?;

        let mut tx = self.pool().begin().await?;

        increment(&mut tx, FORWARD_INCREMENT, "forward", delta.forward_id, in_bytes, out_bytes)
            .await?;
        increment(&mut tx, USER_INCREMENT, "user", delta.user_id, in_bytes, out_bytes).await?;
        let mut rows = 2;
        if let Some(user_tunnel_id) = delta.tunnel_scope() {
            increment(
                &mut tx,
                USER_TUNNEL_INCREMENT,
                "user_tunnel",
                user_tunnel_id,
                in_bytes,
                out_bytes,
            )
            .await?;
            rows += 1;
        }

        tx.commit().await?;

        debug!(
            forward_id = delta.forward_id,
            user_id = delta.user_id,
            user_tunnel_id = ?delta.tunnel_scope(),
            in_bytes,
            out_bytes,
            "Flow delta applied"
        );
        Ok(rows)
    }
}

async fn increment(
    tx: &mut Transaction<'_, Sqlite>,
    statement: &'static str,
    table: &'static str,
    id: i64,
    in_bytes: i64,
    out_bytes: i64,
) -> Result<(), LedgerError> {
    let result = sqlx::query(statement)
        .bind(in_bytes)
        .bind(out_bytes)
        .bind(id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::MissingRow { table, id });
    }
    Ok(())
}

fn to_counter(bytes: u64, field: &str) -> Result<i64, LedgerError> {
    i64::try_from(bytes)
        .map_err(|_| LedgerError::InvalidDelta(format!("{field} {bytes} exceeds counter range")))
}
