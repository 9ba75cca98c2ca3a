//! Broadcast wire shapes and the inbound decrypt-or-passthrough rule.

use flowgate_crypto::SecretDecryptor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Event fanned out to admin listeners. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEnvelope {
    Status { node_id: i64, online: bool },
    Info { node_id: i64, text: String },
}

// Dashboards expect the status id as a string and the info id as a number.
#[derive(Serialize)]
struct StatusWire<'a> {
    id: String,
    #[serde(rename = "type")]
    kind: &'a str,
    data: u8,
}

#[derive(Serialize)]
struct InfoWire<'a> {
    id: i64,
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a str,
}

impl BroadcastEnvelope {
    pub const fn node_id(&self) -> i64 {
        match self {
            Self::Status { node_id, .. } | Self::Info { node_id, .. } => *node_id,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Info { .. } => "info",
        }
    }

    /// Serialize to the JSON text sent to listeners.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Status { node_id, online } => serde_json::to_string(&StatusWire {
                id: node_id.to_string(),
                kind: self.kind(),
                data: u8::from(*online),
            }),
            Self::Info { node_id, text } => serde_json::to_string(&InfoWire {
                id: *node_id,
                kind: self.kind(),
                data: text,
            }),
        }
    }
}

/// Optional envelope a node may wrap its telemetry in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InboundEnvelope {
    pub encrypted: bool,
    pub data: String,
    pub timestamp: Option<i64>,
}

impl InboundEnvelope {
    /// Ciphertext to decrypt, if this envelope carries one.
    fn ciphertext(&self) -> Option<&str> {
        (self.encrypted && !self.data.trim().is_empty()).then_some(self.data.as_str())
    }
}

/// Decide what text to relay for one inbound node frame.
///
/// Frames that are not an encrypted envelope are relayed unchanged. Encrypted
/// envelopes are decrypted with `secret`; on any failure the original frame
/// is relayed instead.
pub fn relay_text(frame: &[u8], secret: &str, decryptor: &dyn SecretDecryptor) -> String {
    let raw = || String::from_utf8_lossy(frame).into_owned();

    let Ok(envelope) = serde_json::from_slice::<InboundEnvelope>(frame) else {
        return raw();
    };
    let Some(ciphertext) = envelope.ciphertext() else {
        return raw();
    };

    match decryptor.decrypt(secret, ciphertext) {
        Ok(plaintext) => String::from_utf8(plaintext).unwrap_or_else(|e| {
            debug!(error = %e, "Decrypted payload is not UTF-8, relaying raw frame");
            raw()
        }),
        Err(e) => {
            debug!(error = %e, "Decryption failed, relaying raw frame");
            raw()
        }
    }
}
