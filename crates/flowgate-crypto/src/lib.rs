//! `flowgate` Node Payload Crypto
//!
//! Decrypts telemetry that proxy nodes wrap in an encrypted envelope before
//! sending it to the control plane. The relay only ever calls the
//! [`SecretDecryptor`] seam; the cipher below is one implementation of it.
//!
//! ## Crypto primitives
//!
//! - **Key**: SHA-256 of the node's shared secret (32 bytes)
//! - **Encryption**: AES-256-GCM, 12-byte random nonce
//! - **Encoding**: standard base64 of `nonce || ciphertext || tag`

pub mod cipher;
pub mod error;

pub use cipher::{AesGcmDecryptor, NONCE_SIZE, NodeCipher, SecretDecryptor};
pub use error::CryptoError;
