//! Developer secret bundle.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable the runtime fills with the developer secret.
pub const SECRETS_ENV_VAR: &str = "IEXEC_APP_DEVELOPER_SECRET";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("secret bundle is neither JSON nor base64 JSON: {0}")]
    Malformed(String),

    #[error("secret bundle field {0} is empty")]
    EmptyField(&'static str),
}

/// Secrets the worker needs. Never logged.
#[derive(Clone, Deserialize)]
pub struct AppSecrets {
    #[serde(rename = "NGROK_TOKEN")]
    pub ngrok_token: String,

    #[serde(rename = "GOSSIP_PRIVATE_KEY")]
    pub gossip_private_key: String,
}

impl AppSecrets {
    /// Read the bundle from the runtime environment.
    pub fn from_env() -> Result<Self, SecretsError> {
        let raw = std::env::var(SECRETS_ENV_VAR).map_err(|_| SecretsError::Missing(SECRETS_ENV_VAR))?;
        Self::parse(&raw)
    }

    /// Parse a bundle given as JSON, or as base64 of that JSON (the form the
    /// deployment config stores).
    pub fn parse(raw: &str) -> Result<Self, SecretsError> {
        let raw = raw.trim();
        let secrets: Self = match serde_json::from_str(raw) {
            Ok(secrets) => secrets,
            Err(json_err) => {
                let decoded = STANDARD
                    .decode(raw)
                    .map_err(|_| SecretsError::Malformed(json_err.to_string()))?;
                serde_json::from_slice(&decoded).map_err(|e| SecretsError::Malformed(e.to_string()))?
            }
        };

        if secrets.ngrok_token.trim().is_empty() {
            return Err(SecretsError::EmptyField("NGROK_TOKEN"));
        }
        if secrets.gossip_private_key.trim().is_empty() {
            return Err(SecretsError::EmptyField("GOSSIP_PRIVATE_KEY"));
        }
        Ok(secrets)
    }
}

impl std::fmt::Debug for AppSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSecrets")
            .field("ngrok_token", &"<redacted>")
            .field("gossip_private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{"NGROK_TOKEN":"tok","GOSSIP_PRIVATE_KEY":"0xabc"}"#;

    #[test]
    fn test_parse_json() {
        let secrets = AppSecrets::parse(BUNDLE).unwrap();
        assert_eq!(secrets.ngrok_token, "tok");
        assert_eq!(secrets.gossip_private_key, "0xabc");
    }

    #[test]
    fn test_parse_base64_json() {
        let secrets = AppSecrets::parse(&STANDARD.encode(BUNDLE)).unwrap();
        assert_eq!(secrets.ngrok_token, "tok");
    }

    #[test]
    fn test_malformed_bundle() {
        assert!(matches!(
            AppSecrets::parse("{not json"),
            Err(SecretsError::Malformed(_))
        ));
        assert!(matches!(
            AppSecrets::parse(r#"{"NGROK_TOKEN":"tok"}"#),
            Err(SecretsError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_field() {
        let err = AppSecrets::parse(r#"{"NGROK_TOKEN":"","GOSSIP_PRIVATE_KEY":"0xabc"}"#).unwrap_err();
        assert!(matches!(err, SecretsError::EmptyField("NGROK_TOKEN")));
    }

    #[test]
    fn test_debug_redacts() {
        let secrets = AppSecrets::parse(BUNDLE).unwrap();
        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("tok\""));
        assert!(!debug.contains("0xabc"));
    }
}
