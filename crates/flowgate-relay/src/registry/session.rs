//! Node session registry.
//!
//! Maps each node id to its single live connection and each connection back
//! to its node id. Both maps sit behind one lock so they can never disagree.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::connection::{ConnId, PeerConnection};

/// One authorized node and the connection it currently owns.
#[derive(Debug, Clone)]
pub struct NodeSession {
    pub node_id: i64,
    /// Shared secret; also the telemetry decryption key.
    pub secret: String,
    pub peer: Arc<PeerConnection>,
}

#[derive(Default)]
struct SessionMaps {
    by_node: HashMap<i64, NodeSession>,
    by_conn: HashMap<ConnId, i64>,
}

/// Thread-safe registry of live node sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<SessionMaps>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `peer` as the current connection for `node_id`.
    ///
    /// Returns the connection it replaced, which the caller must close after
    /// this returns. Re-registering the same connection returns `None`.
    pub async fn register(
        &self,
        node_id: i64,
        secret: String,
        peer: Arc<PeerConnection>,
    ) -> Option<Arc<PeerConnection>> {
        let conn_id = peer.id();
        let previous = {
            let mut maps = self.inner.write().await;
            let previous = maps.by_node.insert(
                node_id,
                NodeSession {
                    node_id,
                    secret,
                    peer,
                },
            );
            if let Some(old) = &previous {
                maps.by_conn.remove(&old.peer.id());
            }
            maps.by_conn.insert(conn_id, node_id);
            previous
        };

        let superseded = previous
            .map(|session| session.peer)
            .filter(|old| old.id() != conn_id);
        match &superseded {
            Some(old) => info!(
                node_id,
                conn_id,
                superseded = old.id(),
                "Node session superseded"
            ),
            None => info!(node_id, conn_id, "Node session registered"),
        }
        superseded
    }

    /// Remove the session for `node_id` if `peer` is still its connection.
    ///
    /// The reverse entry for `peer` is always dropped. Returns whether the
    /// node mapping was removed.
    pub async fn deregister(&self, node_id: i64, peer: &PeerConnection) -> bool {
        let conn_id = peer.id();
        let was_current = {
            let mut maps = self.inner.write().await;
            maps.by_conn.remove(&conn_id);
            let is_current = maps
                .by_node
                .get(&node_id)
                .is_some_and(|session| session.peer.id() == conn_id);
            if is_current {
                maps.by_node.remove(&node_id);
            }
            is_current
        };

        if was_current {
            info!(node_id, conn_id, "Node session deregistered");
        } else {
            debug!(node_id, conn_id, "Stale session teardown, newer connection is current");
        }
        was_current
    }

    /// Node id owning `conn_id`, if that connection is registered.
    pub async fn lookup_by_connection(&self, conn_id: ConnId) -> Option<i64> {
        self.inner.read().await.by_conn.get(&conn_id).copied()
    }

    pub async fn get(&self, node_id: i64) -> Option<NodeSession> {
        self.inner.read().await.by_node.get(&node_id).cloned()
    }

    pub async fn is_online(&self, node_id: i64) -> bool {
        self.inner.read().await.by_node.contains_key(&node_id)
    }

    /// Ids of all nodes with a live session, ascending.
    pub async fn online_nodes(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.read().await.by_node.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.by_node.len()
    }

    /// Check that the forward and reverse maps mirror each other.
    #[cfg(test)]
    pub(crate) async fn assert_consistent(&self) {
        let maps = self.inner.read().await;
        assert_eq!(maps.by_node.len(), maps.by_conn.len(), "map sizes differ");
        for (node_id, session) in &maps.by_node {
            assert_eq!(
                maps.by_conn.get(&session.peer.id()),
                Some(node_id),
                "reverse entry missing for node {node_id}"
            );
        }
    }
}
