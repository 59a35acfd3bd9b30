//! Rendezvous address filtering.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Well-known gossip account shared by every job and client.
pub const DEFAULT_GOSSIP_ADDRESS: &str = "0xCA302f663d7E4F9D4eFD6B57A0586c9c39ED0033";

/// [`DEFAULT_GOSSIP_ADDRESS`] as raw bytes.
pub const DEFAULT_GOSSIP_ACCOUNT: Address = address!("ca302f663d7e4f9d4efd6b57a0586c9c39ed0033");

/// Address of the gossip account.
///
/// Comparison is on the parsed 20-byte value, so checksummed and lowercase
/// spellings are the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GossipAddress(Address);

impl GossipAddress {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// Parse a hex address, with or without `0x`, in any letter case.
    pub fn parse(address: &str) -> Result<Self, String> {
        let trimmed = address.trim();
        let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
        let parsed: Address = format!("0x{}", digits.to_ascii_lowercase())
            .parse()
            .map_err(|e| format!("Invalid gossip address '{}': {}", address, e))?;
        Ok(Self(parsed))
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// True only for self-addressed transactions of the gossip account.
    pub fn accepts(&self, from: Address, to: Option<Address>) -> bool {
        from == self.0 && to == Some(self.0)
    }
}

impl Default for GossipAddress {
    fn default() -> Self {
        Self(DEFAULT_GOSSIP_ACCOUNT)
    }
}

impl std::fmt::Display for GossipAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GossipAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
