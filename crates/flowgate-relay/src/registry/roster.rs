//! Set of connected admin listeners.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::connection::{ConnId, PeerConnection};

#[derive(Clone, Default)]
pub struct AdminRoster {
    listeners: Arc<RwLock<HashMap<ConnId, Arc<PeerConnection>>>>,
}

impl AdminRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, peer: Arc<PeerConnection>) {
        let conn_id = peer.id();
        let total = {
            let mut listeners = self.listeners.write().await;
            listeners.insert(conn_id, peer);
            listeners.len()
        };
        info!(conn_id, total, "Admin listener joined");
    }

    /// Returns whether the listener was present.
    pub async fn remove(&self, conn_id: ConnId) -> bool {
        let (removed, total) = {
            let mut listeners = self.listeners.write().await;
            let removed = listeners.remove(&conn_id).is_some();
            (removed, listeners.len())
        };
        if removed {
            info!(conn_id, total, "Admin listener left");
        }
        removed
    }

    /// Point-in-time copy of the current listeners.
    pub async fn snapshot(&self) -> Vec<Arc<PeerConnection>> {
        self.listeners.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.listeners.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listeners.read().await.is_empty()
    }
}
