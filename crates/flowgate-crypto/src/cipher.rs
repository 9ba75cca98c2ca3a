//! AES-256-GCM cipher keyed by a node's shared secret.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Nonce size for AES-GCM.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size.
const TAG_SIZE: usize = 16;

/// Decrypts a node's envelope payload given the node's secret.
///
/// The relay depends on this trait only, so the cipher can be swapped
/// without touching the connection lifecycle.
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, secret: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError>;
}

/// Default [`SecretDecryptor`] backed by [`NodeCipher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmDecryptor;

impl SecretDecryptor for AesGcmDecryptor {
    fn decrypt(&self, secret: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        NodeCipher::from_secret(secret)?.decrypt(ciphertext)
    }
}

/// Symmetric cipher derived from one node secret.
pub struct NodeCipher {
    cipher: Aes256Gcm,
}

impl NodeCipher {
    /// Derive the cipher key as SHA-256 of `secret`.
    pub fn from_secret(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::InvalidSecret("secret is empty".into()));
        }

        let mut key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::InvalidSecret(e.to_string()));
        key.zeroize();

        Ok(Self { cipher: cipher? })
    }

    /// Encrypt `plaintext` under a fresh random nonce and return the base64
    /// encoding of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a base64 `nonce || ciphertext` string.
    ///
    /// Surrounding whitespace is ignored.
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::TooShort {
                expected: NONCE_SIZE + TAG_SIZE,
                actual: raw.len(),
            });
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
