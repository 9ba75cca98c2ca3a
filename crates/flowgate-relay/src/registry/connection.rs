//! Transport-neutral handle to one live peer connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Process-unique identity of a connection.
pub type ConnId = u64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound on waiting for the sink during [`PeerConnection::close`].
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Send timed out")]
    Timeout,
}

/// Write half of a peer transport.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Holds the write half of a connection plus its close signal.
///
/// Writes are serialized by the sink mutex, so concurrent broadcasts to the
/// same peer never interleave frames.
pub struct PeerConnection {
    id: ConnId,
    sink: Mutex<Box<dyn FrameSink>>,
    shutdown: CancellationToken,
}

impl PeerConnection {
    pub fn new(sink: Box<dyn FrameSink>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            sink: Mutex::new(sink),
            shutdown: CancellationToken::new(),
        })
    }

    pub const fn id(&self) -> ConnId {
        self.id
    }

    /// Send one text frame to the peer.
    pub async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.sink.lock().await.send_text(text.to_owned()).await
    }

    /// Signal the read loop to stop and close the write half.
    ///
    /// Idempotent. The close signal fires immediately; closing the write half
    /// waits for any pending send, but never longer than [`CLOSE_TIMEOUT`].
    pub async fn close(&self) {
        self.shutdown.cancel();
        let closing = async { self.sink.lock().await.close().await };
        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(conn_id = self.id, error = %e, "Close on already-broken connection");
            }
            Err(_) => {
                debug!(conn_id = self.id, "Sink close timed out, abandoning write half");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}

impl std::fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
