//! Crypto error types.

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Ciphertext too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}
