//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, defaults for missing sections)
//!     → validation.rs (semantic checks)
//!     → GossipConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults, so an empty file (or no file) is a valid config
//! - Secrets (tunnel token, gossip key) never live in the config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    ChainConfig, ChatConfig, DiscoveryConfig, GossipConfig, GossipSettings, JobConfig,
    ObservabilityConfig, TunnelConfig,
};
