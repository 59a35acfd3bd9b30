//! Configuration schema definitions.
//!
//! One file configures both halves of the protocol; each binary reads the
//! sections it needs.

use serde::{Deserialize, Serialize};

use crate::gossip::DEFAULT_GOSSIP_ADDRESS;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GossipConfig {
    /// Chain endpoints and transaction settings.
    pub chain: ChainConfig,

    /// Rendezvous channel settings.
    pub gossip: GossipSettings,

    /// Client-side watcher settings.
    pub discovery: DiscoveryConfig,

    /// Worker-side tunnel settings.
    pub tunnel: TunnelConfig,

    /// Confidential job runtime settings.
    pub job: JobConfig,

    /// Chat agent client settings.
    pub chat: ChatConfig,

    pub observability: ObservabilityConfig,
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint used by the publisher.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// WebSocket endpoint used by the watcher for block subscriptions.
    pub ws_url: String,

    /// Chain ID (134 for bellecour).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Blocks required before a publish counts as confirmed (1 = mined).
    pub confirmation_blocks: u32,

    /// Maximum time to wait for a publish to confirm.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub confirmation_poll_ms: u64,

    /// Gas price multiplier (1.0 = as quoted by the node).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://bellecour.iex.ec".to_string(),
            failover_urls: Vec::new(),
            ws_url: "wss://bellecour.iex.ec".to_string(),
            chain_id: 134,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 120,
            confirmation_poll_ms: 2000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GossipSettings {
    /// Address of the gossip account (rendezvous filter).
    pub address: String,

    /// Session key modulus size in bits.
    pub key_bits: usize,
}

impl Default for GossipSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_GOSSIP_ADDRESS.to_string(),
            key_bits: crate::crypto::DEFAULT_KEY_BITS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Give up after this many seconds. `0` waits until resolved or failed.
    pub timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { timeout_secs: 1800 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Local port exposed through the tunnel (the chat agent).
    pub local_port: u16,

    /// Host the tunnel forwards to.
    pub forward_host: String,

    /// Time allowed to authenticate and open the endpoint.
    pub startup_timeout_secs: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            local_port: 11434,
            forward_host: "localhost".to_string(),
            startup_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    /// Output directory. Empty means "read `IEXEC_OUT`".
    pub output_dir: String,

    /// How long to keep the tunnel open after announcing it.
    pub hold_secs: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            hold_secs: 50 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model name sent with each request.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "thewhitewizard/teddy:3b".to_string(),
            temperature: 0.7,
            request_timeout_secs: 120,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
