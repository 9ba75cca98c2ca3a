//! Connection lifecycle controller.
//!
//! Drives a node connection through authorize, register, notify-online,
//! read loop, deregister and notify-offline, and an admin connection through
//! authorize, join roster, drain, leave roster. Transport-specific code lives
//! in [`super::ws`]; everything here works on a [`PeerConnection`] plus a
//! stream of [`InboundFrame`]s.

use std::sync::Arc;

use flowgate_crypto::SecretDecryptor;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::error::ConnectError;
use crate::auth::{Claims, JwtManager};
use crate::hub::{Broadcaster, relay_text};
use crate::registry::{AdminRoster, PeerConnection, SessionRegistry, TransportError};
use crate::storage::{Node, NodeCapabilities, NodeStatus, RelayDatabase};

/// Declared role of an incoming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Node,
    Admin,
}

impl Role {
    /// Accepts the numeric codes dashboards send (`1` node, `0` admin) and
    /// the spelled-out names.
    pub fn parse(raw: &str) -> Result<Self, ConnectError> {
        match raw.trim() {
            "1" | "node" => Ok(Self::Node),
            "0" | "admin" => Ok(Self::Admin),
            other => Err(ConnectError::BadRole(other.to_string())),
        }
    }
}

/// An authorized node about to go online.
#[derive(Debug, Clone)]
pub struct NodeAdmission {
    pub node_id: i64,
    pub secret: String,
    pub caps: NodeCapabilities,
}

/// One frame read from a peer, with the transport details removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Data(Vec<u8>),
    /// Ping/pong and other frames with no payload for the hub.
    Control,
    Close,
}

#[derive(Clone)]
pub struct ConnectionController {
    sessions: SessionRegistry,
    broadcaster: Broadcaster,
    db: RelayDatabase,
    jwt: Arc<JwtManager>,
    decryptor: Arc<dyn SecretDecryptor>,
}

impl ConnectionController {
    pub fn new(
        sessions: SessionRegistry,
        broadcaster: Broadcaster,
        db: RelayDatabase,
        jwt: Arc<JwtManager>,
        decryptor: Arc<dyn SecretDecryptor>,
    ) -> Self {
        Self {
            sessions,
            broadcaster,
            db,
            jwt,
            decryptor,
        }
    }

    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub const fn roster(&self) -> &AdminRoster {
        self.broadcaster.roster()
    }

    pub const fn db(&self) -> &RelayDatabase {
        &self.db
    }

    pub fn decryptor(&self) -> &dyn SecretDecryptor {
        self.decryptor.as_ref()
    }

    /// Resolve the node that owns `secret`.
    pub async fn authorize_node(&self, secret: &str) -> Result<Node, ConnectError> {
        if secret.trim().is_empty() {
            return Err(ConnectError::MissingCredential("secret"));
        }
        self.db
            .get_node_by_secret(secret)
            .await?
            .ok_or(ConnectError::UnknownSecret)
    }

    /// Validate an admin bearer token. Only access tokens are accepted.
    pub fn authorize_admin(&self, token: &str) -> Result<Claims, ConnectError> {
        if token.trim().is_empty() {
            return Err(ConnectError::MissingCredential("token"));
        }
        self.jwt
            .validate_access(token)
            .map_err(|e| ConnectError::InvalidToken(e.to_string()))
    }

    /// Run a node connection to completion.
    ///
    /// Returns once the peer disconnects, the stream fails, or a newer
    /// connection for the same node supersedes this one.
    pub async fn run_node<S>(&self, admission: NodeAdmission, peer: Arc<PeerConnection>, mut inbound: S)
    where
        S: Stream<Item = Result<InboundFrame, TransportError>> + Unpin,
    {
        let NodeAdmission {
            node_id,
            secret,
            caps,
        } = admission;

        if let Some(old) = self
            .sessions
            .register(node_id, secret.clone(), Arc::clone(&peer))
            .await
        {
            // The old socket may be wedged; its teardown must not hold up this one.
            tokio::spawn(async move { old.close().await });
        }

        if let Err(e) = self.db.set_node_online(node_id, &caps).await {
            warn!(node_id, error = %e, "Failed to persist node online status");
        }
        info!(node_id, conn_id = peer.id(), version = %caps.version, "Node online");
        self.broadcaster.notify_status(node_id, true).await;

        loop {
            let next = tokio::select! {
                biased;
                () = peer.closed() => {
                    debug!(node_id, conn_id = peer.id(), "Node connection closed locally");
                    break;
                }
                next = inbound.next() => next,
            };

            match next {
                Some(Ok(InboundFrame::Data(frame))) => {
                    debug!(node_id, bytes = frame.len(), "Node frame received");
                    let text = relay_text(&frame, &secret, self.decryptor.as_ref());
                    self.broadcaster.notify_info(node_id, text).await;
                }
                Some(Ok(InboundFrame::Control)) => {}
                Some(Ok(InboundFrame::Close)) | None => {
                    debug!(node_id, "Node closed the connection");
                    break;
                }
                Some(Err(e)) => {
                    debug!(node_id, error = %e, "Node read failed");
                    break;
                }
            }
        }

        if self.sessions.deregister(node_id, &peer).await {
            if let Err(e) = self.db.set_node_status(node_id, NodeStatus::Offline).await {
                warn!(node_id, error = %e, "Failed to persist node offline status");
            }
            info!(node_id, conn_id = peer.id(), "Node offline");
            self.broadcaster.notify_status(node_id, false).await;
        }
        peer.close().await;
    }

    /// Run an admin listener to completion. Inbound frames are discarded.
    pub async fn run_admin<S>(&self, peer: Arc<PeerConnection>, mut inbound: S)
    where
        S: Stream<Item = Result<InboundFrame, TransportError>> + Unpin,
    {
        let roster = self.roster();
        roster.add(Arc::clone(&peer)).await;

        loop {
            let next = tokio::select! {
                biased;
                () = peer.closed() => break,
                next = inbound.next() => next,
            };
            match next {
                Some(Ok(InboundFrame::Data(_) | InboundFrame::Control)) => {}
                Some(Ok(InboundFrame::Close)) | None => break,
                Some(Err(e)) => {
                    debug!(conn_id = peer.id(), error = %e, "Admin read failed");
                    break;
                }
            }
        }

        roster.remove(peer.id()).await;
        peer.close().await;
    }
}
