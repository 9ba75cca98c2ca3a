//! Error types for `flowgate` core library.

use thiserror::Error;

/// Result type alias using `flowgate` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `flowgate` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
