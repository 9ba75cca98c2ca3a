//! WebSocket surface for nodes and admin listeners.
//!
//! Credentials are checked before the upgrade is accepted, so a rejected
//! caller never becomes a connection.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;
use super::error::ConnectError;
use super::lifecycle::{ConnectionController, InboundFrame, NodeAdmission, Role};
use crate::auth::Claims;
use crate::registry::{FrameSink, PeerConnection, TransportError};
use crate::storage::NodeCapabilities;

/// Query parameters on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "type")]
    pub role: Option<String>,
    pub secret: Option<String>,
    pub token: Option<String>,
    pub version: Option<String>,
    pub http: Option<String>,
    pub tls: Option<String>,
    pub socks: Option<String>,
}

enum Admitted {
    Node(NodeAdmission),
    Admin(Claims),
}

pub async fn connect(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let admitted = match admit(&state.controller, params).await {
        Ok(admitted) => admitted,
        Err(e) => {
            info!(error = %e, status = %e.status(), "Connection refused");
            return e.into_response();
        }
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let controller = state.controller;
    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| serve_socket(controller, admitted, socket))
}

async fn admit(
    controller: &ConnectionController,
    params: ConnectParams,
) -> Result<Admitted, ConnectError> {
    match Role::parse(params.role.as_deref().unwrap_or_default())? {
        Role::Node => {
            let secret = non_blank(params.secret).ok_or(ConnectError::MissingCredential("secret"))?;
            let node = controller.authorize_node(&secret).await?;
            Ok(Admitted::Node(NodeAdmission {
                node_id: node.id,
                secret,
                caps: NodeCapabilities {
                    version: params.version.unwrap_or_default(),
                    http: flag(params.http.as_deref()),
                    tls: flag(params.tls.as_deref()),
                    socks: flag(params.socks.as_deref()),
                },
            }))
        }
        Role::Admin => {
            let token = non_blank(params.token)
                .or_else(|| non_blank(params.secret))
                .ok_or(ConnectError::MissingCredential("token"))?;
            controller.authorize_admin(&token).map(Admitted::Admin)
        }
    }
}

async fn serve_socket(controller: ConnectionController, admitted: Admitted, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let peer = PeerConnection::new(Box::new(WsSink(sink)));
    let inbound = inbound_frames(stream);

    match admitted {
        Admitted::Node(admission) => controller.run_node(admission, peer, inbound).await,
        Admitted::Admin(claims) => {
            debug!(admin = %claims.username, conn_id = peer.id(), "Admin listener connected");
            controller.run_admin(peer, inbound).await;
        }
    }
}

struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.0
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

fn inbound_frames(
    stream: SplitStream<WebSocket>,
) -> impl Stream<Item = Result<InboundFrame, TransportError>> + Unpin {
    stream.map(|message| match message {
        Ok(Message::Text(text)) => Ok(InboundFrame::Data(text.as_str().as_bytes().to_vec())),
        Ok(Message::Binary(bytes)) => Ok(InboundFrame::Data(bytes.to_vec())),
        Ok(Message::Ping(_) | Message::Pong(_)) => Ok(InboundFrame::Control),
        Ok(Message::Close(_)) => Ok(InboundFrame::Close),
        Err(e) => Err(TransportError::Receive(e.to_string())),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Listener flags arrive as strings; anything unparseable counts as off.
fn flag(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
