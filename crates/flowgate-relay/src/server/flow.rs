//! Flow report ingestion.
//!
//! Nodes post one traffic report per request. The body may be wrapped in the
//! same encrypted envelope as telemetry.

use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use super::error::ConnectError;
use crate::hub::relay_text;
use crate::storage::FlowDelta;

#[derive(Debug, Default, Deserialize)]
pub struct FlowParams {
    pub secret: Option<String>,
}

/// Traffic counters for one forward endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowReport {
    /// Service name: `<forward id>_<user id>_<user tunnel id>`.
    pub n: String,
    /// Upload bytes.
    #[serde(default)]
    pub u: u64,
    /// Download bytes.
    #[serde(default)]
    pub d: u64,
}

impl FlowReport {
    pub fn to_delta(&self) -> Result<FlowDelta, ConnectError> {
        let malformed = || ConnectError::Malformed(format!("service name {:?}", self.n));
        let ids: Vec<i64> = self
            .n
            .split('_')
            .map(|part| part.trim().parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;
        let &[forward_id, user_id, user_tunnel_id] = ids.as_slice() else {
            return Err(malformed());
        };

        Ok(FlowDelta {
            forward_id,
            user_id,
            user_tunnel_id: Some(user_tunnel_id),
            in_bytes: self.d,
            out_bytes: self.u,
        })
    }
}

pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<FlowParams>,
    body: Bytes,
) -> Result<&'static str, ConnectError> {
    let secret = params
        .secret
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConnectError::MissingCredential("secret"))?;
    let controller = &state.controller;
    let node = controller.authorize_node(&secret).await?;

    let text = relay_text(&body, &secret, controller.decryptor());
    let report: FlowReport =
        serde_json::from_str(&text).map_err(|e| ConnectError::Malformed(e.to_string()))?;
    let delta = report.to_delta()?;

    let rows = controller.db().apply_flow_delta(&delta).await?;
    debug!(node_id = node.id, service = %report.n, rows, "Flow report applied");
    Ok("ok")
}
