//! HTTP and WebSocket server for flowgate relay.

pub mod error;
pub mod flow;
pub mod health;
pub mod lifecycle;
pub mod ws;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod router_tests;

use axum::Router;
use axum::routing::{get, post};

pub use error::ConnectError;
pub use lifecycle::{ConnectionController, InboundFrame, NodeAdmission, Role};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub controller: ConnectionController,
    pub max_frame_bytes: usize,
}

/// Build the relay router with the WebSocket endpoint mounted at `ws_path`.
pub fn build_router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws::connect))
        .route("/health", get(health::health))
        .route("/flow/upload", post(flow::upload))
        .with_state(state)
}
