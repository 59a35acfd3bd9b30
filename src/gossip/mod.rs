//! Gossip channel: the rendezvous address and the URL envelope.
//!
//! # Data Flow
//! ```text
//! publisher: TunnelUrl → envelope::seal (JSON + encrypt) → self-tx payload
//! watcher:   self-tx from/to == GossipAddress → envelope::open → TunnelUrl
//! ```
//!
//! The address only identifies the channel. Many sessions share it; the
//! encrypted payload decides which session a message belongs to.

pub mod channel;
pub mod envelope;

pub use channel::{GossipAddress, DEFAULT_GOSSIP_ACCOUNT, DEFAULT_GOSSIP_ADDRESS};
pub use envelope::{open, seal, EnvelopeError, TunnelEnvelope, TunnelUrl};
