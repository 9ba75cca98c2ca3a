//! Shared test helpers for registry, hub and lifecycle tests.
//!
//! Provides an in-process [`FrameSink`] that records every frame into a
//! channel, plus variants that fail, stall on send, or hang entirely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowgate_crypto::AesGcmDecryptor;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::auth::JwtManager;
use crate::hub::Broadcaster;
use crate::registry::{AdminRoster, FrameSink, PeerConnection, SessionRegistry, TransportError};
use crate::server::{AppState, ConnectionController, InboundFrame};
use crate::storage::RelayDatabase;

pub const TEST_JWT_SECRET: &[u8] = b"test-secret-key-for-testing";

/// Sending half of a fake inbound connection.
pub type FrameTx = mpsc::UnboundedSender<Result<InboundFrame, TransportError>>;

/// Fake inbound stream plus the handle that feeds it.
///
/// Dropping the sender ends the stream, like a peer hanging up.
pub fn inbound() -> (FrameTx, UnboundedReceiverStream<Result<InboundFrame, TransportError>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx))
}

enum Behavior {
    Record,
    Fail,
    Stall(Duration),
    Wedged,
}

/// Long enough to outlast any test.
const WEDGE: Duration = Duration::from_secs(60);

/// Sink that forwards sent frames to an unbounded channel.
///
/// Closing the sink drops the sender, so the receiver observes `None`.
pub struct RecordingSink {
    tx: Option<mpsc::UnboundedSender<String>>,
    behavior: Behavior,
}

impl RecordingSink {
    fn build(behavior: Behavior) -> (Arc<PeerConnection>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx: Some(tx),
            behavior,
        };
        (PeerConnection::new(Box::new(sink)), rx)
    }

    /// A healthy peer whose frames arrive on the returned receiver.
    pub fn peer() -> (Arc<PeerConnection>, mpsc::UnboundedReceiver<String>) {
        Self::build(Behavior::Record)
    }

    /// A peer whose every send fails.
    pub fn failing_peer() -> (Arc<PeerConnection>, mpsc::UnboundedReceiver<String>) {
        Self::build(Behavior::Fail)
    }

    /// A peer whose sends take `delay` before recording.
    pub fn stalled_peer(delay: Duration) -> (Arc<PeerConnection>, mpsc::UnboundedReceiver<String>) {
        Self::build(Behavior::Stall(delay))
    }

    /// A peer whose sends and close both hang, like a socket with a full
    /// send buffer and an unresponsive remote.
    pub fn wedged_peer() -> (Arc<PeerConnection>, mpsc::UnboundedReceiver<String>) {
        Self::build(Behavior::Wedged)
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        match self.behavior {
            Behavior::Fail => return Err(TransportError::Send("broken pipe".into())),
            Behavior::Stall(delay) => tokio::time::sleep(delay).await,
            Behavior::Wedged => tokio::time::sleep(WEDGE).await,
            Behavior::Record => {}
        }
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(text).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if matches!(self.behavior, Behavior::Wedged) {
            tokio::time::sleep(WEDGE).await;
        }
        self.tx = None;
        Ok(())
    }
}

/// In-memory database with one node registered under `secret`.
///
/// The node row is inserted with an explicit id so tests can assert on the
/// exact id in broadcast frames.
pub async fn db_with_node(node_id: i64, secret: &str) -> RelayDatabase {
    let db = RelayDatabase::open_in_memory().await.unwrap();
    sqlx::query("INSERT INTO node (id, name, secret, created_time) VALUES (?, ?, ?, 0)")
        .bind(node_id)
        .bind(format!("node-{node_id}"))
        .bind(secret)
        .execute(db.pool())
        .await
        .unwrap();
    db
}

/// Receive the next frame or panic after one second.
pub async fn next_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("sink closed")
}

/// Controller over `db` with fresh registry and roster.
pub fn test_controller(db: RelayDatabase) -> ConnectionController {
    ConnectionController::new(
        SessionRegistry::new(),
        Broadcaster::new(AdminRoster::new(), Duration::from_millis(500)),
        db,
        Arc::new(JwtManager::new(TEST_JWT_SECRET, 3600)),
        Arc::new(AesGcmDecryptor),
    )
}

pub fn test_state(db: RelayDatabase) -> AppState {
    AppState {
        controller: test_controller(db),
        max_frame_bytes: 1 << 20,
    }
}

/// Poll until the roster holds exactly `count` listeners.
pub async fn wait_for_admins(controller: &ConnectionController, count: usize) {
    for _ in 0..200 {
        if controller.roster().len().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("roster never reached {count} listeners");
}
