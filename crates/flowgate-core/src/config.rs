//! Configuration resolution for flowgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`$XDG_CONFIG_HOME/flowgate/relay.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`FLOWGATE_*`)
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! File layers merge key by key: a field set in the explicit file overrides
//! the same field from the global file, and everything else is inherited.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Secret used when nothing else is configured. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Complete flowgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP/WebSocket server binds to.
    pub addr: String,
    /// Path of the WebSocket endpoint nodes and dashboards connect to.
    pub ws_path: String,
    pub database_path: Option<PathBuf>,
    /// Largest inbound WebSocket message accepted from a peer.
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:6365".to_string(),
            ws_path: "/system-info".to_string(),
            database_path: None,
            max_frame_bytes: 4 * 1024 * 1024, // 4 MiB
        }
    }
}

/// Admin token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of tokens minted by `issue-token`.
    pub access_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if !self.server.ws_path.starts_with('/') {
            return Err(Error::Config(format!(
                "server.ws_path must start with '/', got {:?}",
                self.server.ws_path
            )));
        }
        if self.broadcast.send_timeout_ms == 0 {
            return Err(Error::Config("broadcast.send_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Admin fan-out configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Upper bound on a single write to one admin listener.
    pub send_timeout_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default env-filter directives when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "flowgate_relay=info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// A missing global file is skipped; an explicit file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|p| p.exists());
    load_layered(global.as_deref(), explicit, |key| std::env::var(key).ok())
}

fn load_layered(
    global: Option<&Path>,
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = Value::Object(serde_json::Map::new());
    for path in global.into_iter().chain(explicit) {
        merge_json(&mut merged, read_config_value(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
    apply_env_overrides(&mut config, lookup);
    config.validate()?;
    Ok(config)
}

/// Recursively overlay `overlay` onto `base`; objects merge, other values replace.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|p| p.join("flowgate").join("relay.json"))
}

/// Default relay database location (`~/.flowgate/relay.db`).
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".flowgate").join("relay.db"))
}

fn config_home() -> Option<PathBuf> {
    dirs::config_dir()
}

fn read_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `FLOWGATE_*` overrides read through `lookup`.
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("FLOWGATE_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = lookup("FLOWGATE_WS_PATH") {
        config.server.ws_path = val;
    }
    if let Some(val) = lookup("FLOWGATE_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(n) = lookup("FLOWGATE_MAX_FRAME_BYTES").and_then(|v| v.parse().ok()) {
        config.server.max_frame_bytes = n;
    }
    if let Some(val) = lookup("FLOWGATE_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(n) = lookup("FLOWGATE_SEND_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.broadcast.send_timeout_ms = n;
    }
    if let Some(val) = lookup("FLOWGATE_LOG_JSON") {
        config.logging.json = matches!(val.as_str(), "1" | "true" | "yes");
    }
}
