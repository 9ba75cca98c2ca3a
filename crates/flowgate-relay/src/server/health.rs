//! Liveness endpoint for load balancers and operators.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub nodes: usize,
    pub admins: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    // If this handler runs, the relay is serving.
    Json(HealthReport {
        status: "ok",
        nodes: state.controller.sessions().session_count().await,
        admins: state.controller.roster().len().await,
    })
}
