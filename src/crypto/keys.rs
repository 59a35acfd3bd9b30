//! Session key pairs and their one-line text encoding.
//!
//! Keys travel as base64 of a PEM export so they fit in a single argument or
//! config field: SPKI (`PUBLIC KEY`) for the public half, PKCS#1
//! (`RSA PRIVATE KEY`) for the private half, the layout node-rsa exports.
//! PKCS#8 private keys are accepted on import.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::crypto::{CryptoError, CryptoResult};

/// Default modulus size for session keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest modulus accepted for session keys.
pub const MIN_KEY_BITS: usize = 1024;

/// OAEP-SHA1 overhead: two digests plus two bytes.
const OAEP_OVERHEAD: usize = 2 * 20 + 2;

/// Fresh key pair owned by one discovery session.
#[derive(Debug, Clone)]
pub struct SessionKeyPair {
    public: SessionPublicKey,
    private: SessionPrivateKey,
}

impl SessionKeyPair {
    /// Generate a key pair with the default modulus size.
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with_bits(DEFAULT_KEY_BITS)
    }

    /// Generate a key pair with an explicit modulus size.
    pub fn generate_with_bits(bits: usize) -> CryptoResult<Self> {
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::KeyGeneration(format!(
                "key size {} is below the minimum of {} bits",
                bits, MIN_KEY_BITS
            )));
        }

        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        tracing::debug!(bits = bits, "Session key pair generated");

        Ok(Self {
            public: SessionPublicKey(public),
            private: SessionPrivateKey(private),
        })
    }

    pub fn public_key(&self) -> &SessionPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &SessionPrivateKey {
        &self.private
    }

    /// Split into the half handed to the job and the half kept locally.
    pub fn into_parts(self) -> (SessionPublicKey, SessionPrivateKey) {
        (self.public, self.private)
    }
}

/// Public half of a session key; safe to share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPublicKey(RsaPublicKey);

impl SessionPublicKey {
    /// Parse base64 of a SPKI PEM export.
    ///
    /// A malformed key surfaces as an encryption error, since the only use of
    /// a public key is to encrypt for it.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let pem = decode_pem(encoded.trim())
            .map_err(|e| CryptoError::Encryption(format!("malformed public key: {}", e)))?;
        let key = RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| CryptoError::Encryption(format!("malformed public key: {}", e)))?;
        Ok(Self(key))
    }

    /// Export as base64 of a SPKI PEM.
    pub fn to_base64(&self) -> CryptoResult<String> {
        let pem = self
            .0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(STANDARD.encode(pem.as_bytes()))
    }

    /// Largest plaintext, in bytes, this key can encrypt.
    pub fn max_plaintext_len(&self) -> usize {
        self.0.size().saturating_sub(OAEP_OVERHEAD)
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

/// Private half of a session key. Never leaves the client session.
#[derive(Clone)]
pub struct SessionPrivateKey(RsaPrivateKey);

impl SessionPrivateKey {
    /// Parse base64 of a PKCS#1 or PKCS#8 PEM export.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let pem = decode_pem(encoded.trim())
            .map_err(|e| CryptoError::Decryption(format!("malformed private key: {}", e)))?;
        let key = RsaPrivateKey::from_pkcs1_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
            .map_err(|e| CryptoError::Decryption(format!("malformed private key: {}", e)))?;
        Ok(Self(key))
    }

    /// Export as base64 of a PKCS#1 PEM.
    pub fn to_base64(&self) -> CryptoResult<String> {
        let pem = self
            .0
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(STANDARD.encode(pem.as_bytes()))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> SessionPublicKey {
        SessionPublicKey(RsaPublicKey::from(&self.0))
    }

    pub(crate) fn inner(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl std::fmt::Debug for SessionPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPrivateKey")
            .field("bits", &(self.0.size() * 8))
            .finish_non_exhaustive()
    }
}

fn decode_pem(encoded: &str) -> Result<String, String> {
    let bytes = STANDARD.decode(encoded).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}
