//! Fan-out of hub events to every admin listener.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use super::envelope::BroadcastEnvelope;
use crate::registry::{AdminRoster, PeerConnection, TransportError};

/// Outcome of one broadcast. Callers are free to ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Listeners whose send errored or was not confirmed within the send
    /// timeout. A timed-out frame may still have reached the peer. Every
    /// listener counted here has been evicted from the roster.
    pub failed: usize,
}

/// Sends envelopes to the listeners present when each broadcast starts.
#[derive(Clone)]
pub struct Broadcaster {
    roster: AdminRoster,
    send_timeout: Duration,
}

impl Broadcaster {
    pub const fn new(roster: AdminRoster, send_timeout: Duration) -> Self {
        Self {
            roster,
            send_timeout,
        }
    }

    pub const fn roster(&self) -> &AdminRoster {
        &self.roster
    }

    pub async fn notify_status(&self, node_id: i64, online: bool) -> BroadcastReport {
        self.broadcast(&BroadcastEnvelope::Status { node_id, online })
            .await
    }

    pub async fn notify_info(&self, node_id: i64, text: String) -> BroadcastReport {
        self.broadcast(&BroadcastEnvelope::Info { node_id, text }).await
    }

    /// Send `envelope` to each listener concurrently.
    ///
    /// A failing or slow listener only affects its own delivery, and is then
    /// dropped from the roster and disconnected so later broadcasts do not
    /// wait on it again.
    pub async fn broadcast(&self, envelope: &BroadcastEnvelope) -> BroadcastReport {
        let text = match envelope.to_wire() {
            Ok(text) => text,
            Err(e) => {
                warn!(node_id = envelope.node_id(), error = %e, "Failed to encode broadcast");
                return BroadcastReport::default();
            }
        };

        let listeners = self.roster.snapshot().await;
        if listeners.is_empty() {
            return BroadcastReport::default();
        }

        let results = join_all(
            listeners
                .iter()
                .map(|listener| self.send_one(listener, &text)),
        )
        .await;

        let mut report = BroadcastReport::default();
        for (listener, result) in listeners.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        conn_id = listener.id(),
                        node_id = envelope.node_id(),
                        kind = envelope.kind(),
                        error = %e,
                        "Broadcast to admin listener failed, evicting"
                    );
                    self.evict(listener).await;
                }
            }
        }
        debug!(
            node_id = envelope.node_id(),
            kind = envelope.kind(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }

    async fn evict(&self, listener: &Arc<PeerConnection>) {
        self.roster.remove(listener.id()).await;
        let listener = Arc::clone(listener);
        tokio::spawn(async move { listener.close().await });
    }

    async fn send_one(&self, listener: &Arc<PeerConnection>, text: &str) -> Result<(), TransportError> {
        tokio::time::timeout(self.send_timeout, listener.send_text(text))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}
