//! Session cryptography.
//!
//! # Data Flow
//! ```text
//! client: SessionKeyPair::generate()
//!     → public half (base64 PEM) handed to the job as an argument
//!     → private half kept by the watcher
//!
//! worker: encrypt(envelope, public key) → "0x" + hex(ciphertext)
//! client: decrypt("0x" + hex, private key) → envelope
//! ```
//!
//! # Security Constraints
//! - Keys are generated per session and never persisted
//! - Private keys are never logged (`Debug` is redacted)
//! - Decryption failure is routine: most gossip payloads belong to other sessions

pub mod codec;
pub mod keys;

use thiserror::Error;

pub use codec::{decrypt, decrypt_bytes, encrypt, encrypt_bytes, HEX_PREFIX};
pub use keys::{SessionKeyPair, SessionPrivateKey, SessionPublicKey, DEFAULT_KEY_BITS};

/// Errors raised by the session codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed public key or plaintext too large for the key.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Malformed input, wrong key, or corrupted ciphertext.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Key pair generation or export failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
