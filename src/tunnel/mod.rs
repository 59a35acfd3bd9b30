//! Worker-side tunnel publishing.
//!
//! # Data Flow
//! ```text
//! open_tunnel(provider, local_port, token)   (provider.rs, ngrok.rs)
//!     → Tunnel { public_url }                 strictly before publishing
//! TunnelPublisher::publish_url(url, session public key)   (publisher.rs)
//!     → gossip::seal → GossipSender::send_gossip (self-tx, confirmed)
//! ```
//!
//! Both failures are fatal to the job run; nothing here retries.

pub mod ngrok;
pub mod provider;
pub mod publisher;

use std::time::Duration;
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::crypto::CryptoError;

pub use ngrok::NgrokTunnels;
pub use provider::{open_tunnel, Tunnel, TunnelProvider};
pub use publisher::{ChainGossipSender, GossipSender, TunnelPublisher};

/// Reverse tunnel could not be established.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Missing or refused auth token.
    #[error("Tunnel provider rejected the session: {0}")]
    Rejected(String),

    /// The tunnel session could not be established.
    #[error("Failed to connect tunnel session: {0}")]
    Connect(String),

    /// The endpoint could not be opened, or reported an unusable URL.
    #[error("Failed to open tunnel endpoint: {0}")]
    Listen(String),

    /// No public URL before the startup deadline.
    #[error("No public URL after {0:?}")]
    Timeout(Duration),
}

/// Announcing the URL on chain failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encrypt tunnel URL: {0}")]
    Encryption(#[from] CryptoError),

    /// Signing, broadcast, or confirmation failed.
    #[error("Failed to gossip url: {0}")]
    Chain(#[from] BlockchainError),

    #[error("Gossip transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: String, reason: String },
}
