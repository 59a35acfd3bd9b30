//! Tunnel URL envelope: `{"url": "..."}`, encrypted for one session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{self, CryptoError, SessionPrivateKey, SessionPublicKey};

/// Errors from opening a gossip payload. Each one means "not for us".
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Payload did not decrypt under this session's key.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Plaintext is not a JSON envelope with a `url` field.
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope carried something that is not a usable URL.
    #[error("Invalid tunnel URL: {0}")]
    InvalidUrl(String),
}

/// Public base URL of an exposed service.
///
/// Kept exactly as published; validation never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TunnelUrl(String);

impl TunnelUrl {
    /// Accept absolute `http`/`https` URLs with a host.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| EnvelopeError::InvalidUrl(format!("{}: {}", raw, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EnvelopeError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(EnvelopeError::InvalidUrl(format!("{}: missing host", raw)));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a path onto the base URL without doubling slashes.
    pub fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.0.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Display for TunnelUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TunnelUrl {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TunnelUrl> for String {
    fn from(url: TunnelUrl) -> Self {
        url.0
    }
}

impl std::str::FromStr for TunnelUrl {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// JSON body carried inside the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelEnvelope {
    pub url: String,
}

/// Build the envelope for `url` and encrypt it for `recipient`.
pub fn seal(url: &TunnelUrl, recipient: &SessionPublicKey) -> Result<Vec<u8>, CryptoError> {
    let envelope = TunnelEnvelope {
        url: url.as_str().to_string(),
    };
    let json = serde_json::to_vec(&envelope)
        .map_err(|e| CryptoError::Encryption(format!("envelope serialization: {}", e)))?;
    crypto::encrypt_bytes(&json, recipient)
}

/// Decrypt a payload and parse the envelope inside it.
///
/// Decryption, JSON parsing, and URL validation fail independently; callers
/// scanning the chain treat all three the same way.
pub fn open(payload: &[u8], private_key: &SessionPrivateKey) -> Result<TunnelUrl, EnvelopeError> {
    let plaintext = crypto::decrypt_bytes(payload, private_key)?;
    let envelope: TunnelEnvelope = serde_json::from_slice(&plaintext)?;
    TunnelUrl::parse(&envelope.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionKeyPair;

    #[test]
    fn test_seal_and_open() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let url = TunnelUrl::parse("https://abc123.ngrok.io").unwrap();

        let payload = seal(&url, keys.public_key()).unwrap();
        let opened = open(&payload, keys.private_key()).unwrap();
        assert_eq!(opened.as_str(), "https://abc123.ngrok.io");
    }

    #[test]
    fn test_non_json_plaintext() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let payload = crypto::encrypt_bytes(b"hello, not json", keys.public_key()).unwrap();
        assert!(matches!(
            open(&payload, keys.private_key()),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_url_field() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let payload = crypto::encrypt_bytes(br#"{"foo":"bar"}"#, keys.public_key()).unwrap();
        assert!(matches!(
            open(&payload, keys.private_key()),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_url_in_envelope() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let payload = crypto::encrypt_bytes(br#"{"url":"ftp://x.example"}"#, keys.public_key()).unwrap();
        assert!(matches!(
            open(&payload, keys.private_key()),
            Err(EnvelopeError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_kept_verbatim() {
        let url = TunnelUrl::parse("https://abc123.ngrok.io").unwrap();
        assert_eq!(url.to_string(), "https://abc123.ngrok.io");
        assert_eq!(url.join("/api/chat"), "https://abc123.ngrok.io/api/chat");

        let slashed = TunnelUrl::parse("https://abc123.ngrok.io/").unwrap();
        assert_eq!(slashed.join("api/chat"), "https://abc123.ngrok.io/api/chat");
    }

    #[test]
    fn test_url_rejections() {
        assert!(TunnelUrl::parse("not a url").is_err());
        assert!(TunnelUrl::parse("file:///etc/passwd").is_err());
    }
}
