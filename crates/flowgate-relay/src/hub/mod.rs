//! Broadcast hub: event envelopes and fan-out to admin listeners.

pub mod broadcast;
pub mod envelope;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use envelope::{BroadcastEnvelope, InboundEnvelope, relay_text};
