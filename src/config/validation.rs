//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: GossipConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::GossipConfig;
use crate::crypto::keys::MIN_KEY_BITS;
use crate::gossip::GossipAddress;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every section; collect all problems.
pub fn validate_config(config: &GossipConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    check_url(&config.chain.rpc_url, &["http", "https"], "chain.rpc_url", &mut fail);
    check_url(&config.chain.ws_url, &["ws", "wss"], "chain.ws_url", &mut fail);
    if config.chain.rpc_timeout_secs == 0 {
        fail("chain.rpc_timeout_secs", "must be greater than 0".to_string());
    }
    if config.chain.confirmation_timeout_secs == 0 {
        fail("chain.confirmation_timeout_secs", "must be greater than 0".to_string());
    }
    if !(config.chain.gas_price_multiplier >= 1.0) {
        fail("chain.gas_price_multiplier", "must be at least 1.0".to_string());
    }

    if let Err(e) = GossipAddress::parse(&config.gossip.address) {
        fail("gossip.address", e);
    }
    if config.gossip.key_bits < MIN_KEY_BITS {
        fail(
            "gossip.key_bits",
            format!("must be at least {} bits", MIN_KEY_BITS),
        );
    }

    if config.tunnel.local_port == 0 {
        fail("tunnel.local_port", "must be a non-zero port".to_string());
    }
    if config.tunnel.forward_host.trim().is_empty() {
        fail("tunnel.forward_host", "must not be empty".to_string());
    }
    if config.tunnel.startup_timeout_secs == 0 {
        fail("tunnel.startup_timeout_secs", "must be greater than 0".to_string());
    }

    if !(0.0..=2.0).contains(&config.chat.temperature) {
        fail("chat.temperature", "must be within 0.0..=2.0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(
    raw: &str,
    schemes: &[&str],
    field: &'static str,
    fail: &mut impl FnMut(&'static str, String),
) {
    match url::Url::parse(raw) {
        Ok(parsed) if schemes.contains(&parsed.scheme()) => {}
        Ok(parsed) => fail(
            field,
            format!("scheme '{}' not one of {:?}", parsed.scheme(), schemes),
        ),
        Err(e) => fail(field, format!("invalid URL '{}': {}", raw, e)),
    }
}
