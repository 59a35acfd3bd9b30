//! Client-side tunnel URL discovery.
//!
//! # Data Flow
//! ```text
//! ChainSource::subscribe_blocks (Subscribed)
//!     → per block: block_transactions + transaction (Scanning)
//!     → GossipAddress::accepts(from, to) (Matched)
//!     → gossip::open(payload, session key)
//!         ok  → drop subscription, return TunnelUrl (Resolved)
//!         err → skip silently
//!     subscription error / stream end → DiscoveryError::Subscription (Failed)
//! ```
//!
//! # Cost
//! Every block is scanned linearly and every address match costs one RSA
//! decryption. That is fine at low chain throughput; many concurrent sessions
//! on a busy chain would want a cheaper pre-filter.

pub mod source;
pub mod watcher;

use std::time::Duration;
use thiserror::Error;

pub use source::{AlloyChainSource, BlockRef, BlockStream, ChainSource, ChainTransaction};
pub use watcher::{ChainWatcher, Discovery};

/// Terminal discovery failures.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The block subscription failed or ended.
    #[error("Failed to get https tunnel URL: {0}")]
    Subscription(String),

    /// Fetching a block or transaction failed. Skipped during scanning.
    #[error("Chain fetch failed: {0}")]
    Fetch(String),

    /// No URL arrived before the deadline.
    #[error("Tunnel discovery timed out after {0:?}")]
    Timeout(Duration),

    /// The caller abandoned discovery.
    #[error("Tunnel discovery cancelled")]
    Cancelled,

    /// The background discovery task died.
    #[error("Tunnel discovery task failed: {0}")]
    Task(String),
}

/// Result type for discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
