//! Confidential job runtime glue.
//!
//! # Data Flow
//! ```text
//! IEXEC_APP_DEVELOPER_SECRET → secrets.rs (tunnel token, gossip key)
//! argv[1]                    → session public key
//!     → runner.rs: open tunnel → publish URL
//!     → output.rs: result.json + computed.json in IEXEC_OUT (always)
//! ```

pub mod output;
pub mod runner;
pub mod secrets;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::tunnel::{PublishError, TunnelError};

pub use output::{JobOutput, OutputError, OUTPUT_DIR_ENV_VAR};
pub use runner::{JobRunner, LiveTunnel};
pub use secrets::{AppSecrets, SecretsError, SECRETS_ENV_VAR};

/// Any failure that ends a job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to load app secrets: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Invalid session public key: {0}")]
    SessionKey(#[from] CryptoError),

    #[error(transparent)]
    Tunnel(#[from] TunnelError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
