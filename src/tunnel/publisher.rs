//! Confidential announcement of the tunnel URL on chain.

use alloy::primitives::{Address, Bytes, TxHash};
use std::future::Future;

use crate::blockchain::{BlockchainClient, BlockchainResult, ConfirmationStatus, TxBuilder, Wallet};
use crate::crypto::SessionPublicKey;
use crate::gossip::{self, GossipAddress, TunnelUrl};
use crate::observability::metrics;
use crate::tunnel::PublishError;

/// Write side of the gossip channel: the gossip account sending to itself.
pub trait GossipSender: Send + Sync {
    /// Address of the gossip account this sender signs for.
    fn gossip_address(&self) -> GossipAddress;

    /// Submit a self-addressed transaction carrying `payload` and wait until
    /// it is confirmed.
    fn send_gossip(&self, payload: Bytes) -> impl Future<Output = Result<TxHash, PublishError>> + Send;
}

/// Gossip sender signing with the gossip account key over JSON-RPC.
#[derive(Debug, Clone)]
pub struct ChainGossipSender {
    builder: TxBuilder,
    address: Address,
    confirmation_timeout_secs: u64,
}

impl ChainGossipSender {
    /// Build from the gossip account's hex private key.
    pub fn from_private_key(client: BlockchainClient, private_key_hex: &str) -> BlockchainResult<Self> {
        let wallet = Wallet::from_private_key(private_key_hex, client.config().chain_id)?;
        Ok(Self::new(client, wallet))
    }

    pub fn new(client: BlockchainClient, wallet: Wallet) -> Self {
        let confirmation_timeout_secs = client.config().confirmation_timeout_secs;
        let address = wallet.address();
        Self {
            builder: TxBuilder::new(client, wallet),
            address,
            confirmation_timeout_secs,
        }
    }
}

impl GossipSender for ChainGossipSender {
    fn gossip_address(&self) -> GossipAddress {
        GossipAddress::new(self.address)
    }

    async fn send_gossip(&self, payload: Bytes) -> Result<TxHash, PublishError> {
        let tx_hash = self.builder.send(self.address, payload).await?;
        tracing::info!(tx_hash = %tx_hash, "gossip url tx");

        match self
            .builder
            .wait_for_confirmation(tx_hash, self.confirmation_timeout_secs)
            .await?
        {
            ConfirmationStatus::Confirmed { block_number } => {
                tracing::info!(tx_hash = %tx_hash, block = block_number, "Gossip transaction confirmed");
                Ok(tx_hash)
            }
            ConfirmationStatus::Failed(reason) => Err(PublishError::Reverted {
                tx_hash: tx_hash.to_string(),
                reason,
            }),
        }
    }
}

/// Announces tunnel URLs to the sessions that asked for them.
#[derive(Debug)]
pub struct TunnelPublisher<G> {
    sender: G,
}

impl<G: GossipSender> TunnelPublisher<G> {
    pub fn new(sender: G) -> Self {
        Self { sender }
    }

    /// Encrypt `{"url": url}` for `recipient` and publish it on the channel.
    pub async fn publish_url(
        &self,
        url: &TunnelUrl,
        recipient: &SessionPublicKey,
    ) -> Result<TxHash, PublishError> {
        let payload = gossip::seal(url, recipient)?;

        tracing::info!(
            gossip = %self.sender.gossip_address(),
            payload_bytes = payload.len(),
            "Publishing tunnel URL"
        );

        match self.sender.send_gossip(Bytes::from(payload)).await {
            Ok(tx_hash) => {
                metrics::record_publish("ok");
                Ok(tx_hash)
            }
            Err(e) => {
                metrics::record_publish("failed");
                tracing::error!(error = %e, "Failed to publish tunnel URL");
                Err(e)
            }
        }
    }

    pub fn sender(&self) -> &G {
        &self.sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionKeyPair;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Bytes>>,
    }

    impl GossipSender for RecordingSender {
        fn gossip_address(&self) -> GossipAddress {
            GossipAddress::default()
        }

        async fn send_gossip(&self, payload: Bytes) -> Result<TxHash, PublishError> {
            self.sent.lock().unwrap().push(payload);
            Ok(TxHash::repeat_byte(0xab))
        }
    }

    #[tokio::test]
    async fn test_payload_is_encrypted_for_recipient() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let publisher = TunnelPublisher::new(RecordingSender::default());
        let url = TunnelUrl::parse("https://abc123.ngrok.io").unwrap();

        let tx_hash = publisher.publish_url(&url, keys.public_key()).await.unwrap();
        assert_eq!(tx_hash, TxHash::repeat_byte(0xab));

        let sent = publisher.sender().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        // The URL never appears in clear on chain
        let haystack = String::from_utf8_lossy(&sent[0]);
        assert!(!haystack.contains("abc123"));
        assert_eq!(gossip::open(&sent[0], keys.private_key()).unwrap(), url);
    }

    #[tokio::test]
    async fn test_oversized_url_fails_before_sending() {
        let keys = SessionKeyPair::generate_with_bits(1024).unwrap();
        let publisher = TunnelPublisher::new(RecordingSender::default());
        let url = TunnelUrl::parse(&format!("https://abc123.ngrok.io/{}", "a".repeat(100))).unwrap();

        let err = publisher.publish_url(&url, keys.public_key()).await.unwrap_err();
        assert!(matches!(err, PublishError::Encryption(_)));
        assert!(publisher.sender().sent.lock().unwrap().is_empty());
    }
}
