//! Read access to the chain for the watcher.

use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, BlockHash, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use futures_util::stream::{BoxStream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::discovery::{DiscoveryError, DiscoveryResult};

/// New-block notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub number: u64,
    pub hash: BlockHash,
}

/// The transaction fields the channel filter and decoder need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub input: Bytes,
}

/// Stream of new blocks. An `Err` item or the end of the stream means the
/// subscription is dead.
pub type BlockStream = BoxStream<'static, DiscoveryResult<BlockRef>>;

/// What the watcher needs from a chain connection.
///
/// Dropping the stream returned by `subscribe_blocks` unsubscribes.
pub trait ChainSource: Send + Sync {
    fn subscribe_blocks(&self) -> impl Future<Output = DiscoveryResult<BlockStream>> + Send;

    /// Hashes of every transaction in `block`.
    fn block_transactions(
        &self,
        block: BlockRef,
    ) -> impl Future<Output = DiscoveryResult<Vec<TxHash>>> + Send;

    /// `Ok(None)` when the node does not know the hash.
    fn transaction(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = DiscoveryResult<Option<ChainTransaction>>> + Send;
}

/// Chain source over an alloy WebSocket provider.
///
/// Owns its connection; dropping the source closes it.
#[derive(Clone)]
pub struct AlloyChainSource {
    provider: DynProvider,
    request_timeout: Duration,
}

impl AlloyChainSource {
    /// Open a WebSocket connection to `ws_url`.
    pub async fn connect(ws_url: &str, request_timeout: Duration) -> DiscoveryResult<Self> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(ws_url))
            .await
            .map_err(|e| DiscoveryError::Subscription(format!("connect {}: {}", ws_url, e)))?;

        tracing::info!(ws_url = %ws_url, "Chain connection open");

        Ok(Self {
            provider: provider.erased(),
            request_timeout,
        })
    }
}

impl ChainSource for AlloyChainSource {
    async fn subscribe_blocks(&self) -> DiscoveryResult<BlockStream> {
        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| DiscoveryError::Subscription(e.to_string()))?;

        let stream = subscription.into_stream().map(|header| {
            Ok(BlockRef {
                number: header.inner.number,
                hash: header.hash,
            })
        });
        Ok(stream.boxed())
    }

    async fn block_transactions(&self, block: BlockRef) -> DiscoveryResult<Vec<TxHash>> {
        let fetched = timeout(self.request_timeout, self.provider.get_block_by_hash(block.hash))
            .await
            .map_err(|_| DiscoveryError::Fetch(format!("block {} timed out", block.number)))?
            .map_err(|e| DiscoveryError::Fetch(e.to_string()))?;

        match fetched {
            Some(full) => Ok(full.transactions.hashes().collect()),
            None => Err(DiscoveryError::Fetch(format!("block {} not found", block.hash))),
        }
    }

    async fn transaction(&self, hash: TxHash) -> DiscoveryResult<Option<ChainTransaction>> {
        let fetched = timeout(self.request_timeout, self.provider.get_transaction_by_hash(hash))
            .await
            .map_err(|_| DiscoveryError::Fetch(format!("transaction {} timed out", hash)))?
            .map_err(|e| DiscoveryError::Fetch(e.to_string()))?;

        Ok(fetched.map(|tx| ChainTransaction {
            hash,
            from: tx.inner.signer(),
            to: tx.to(),
            input: tx.input().clone(),
        }))
    }
}

impl std::fmt::Debug for AlloyChainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainSource")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
