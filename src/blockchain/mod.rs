//! Chain access for the worker side.
//!
//! # Data Flow
//! ```text
//! Job secrets (gossip account private key, RPC URL from config)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → transaction.rs (build, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - The gossip key comes from the job's secret bundle or the environment
//! - Never log private keys
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use transaction::TxBuilder;
pub use types::{BlockchainError, BlockchainResult, ChainConfig, ChainId, ConfirmationStatus};
pub use wallet::Wallet;
