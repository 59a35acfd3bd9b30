//! Confidential tunnel URL exchange over a public chain.
//!
//! A worker exposes a local service through a reverse tunnel and announces
//! the public URL, encrypted for one client session, in a self-addressed
//! transaction of a shared gossip account. The client watches new blocks and
//! decrypts the first payload meant for it.

pub mod blockchain;
pub mod chat;
pub mod config;
pub mod crypto;
pub mod discovery;
pub mod gossip;
pub mod job;
pub mod lifecycle;
pub mod observability;
pub mod tunnel;

pub use config::GossipConfig;
pub use crypto::SessionKeyPair;
pub use discovery::ChainWatcher;
pub use gossip::{GossipAddress, TunnelUrl};
pub use tunnel::TunnelPublisher;
