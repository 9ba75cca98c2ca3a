//! Shared tracing/logging initialization.
//!
//! The relay binary and the test harnesses build their subscriber here so the
//! filter resolution (`RUST_LOG` first, then the configured default) stays in
//! one place.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve the env-filter: `RUST_LOG` wins over `default_filter`.
///
/// An unparseable directive string falls back to `info` rather than
/// refusing to start.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"flowgate_relay=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let filter = env_filter(default_filter);
    let result = if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
