//! The chain watcher: scan new blocks until our URL shows up.

use alloy::primitives::TxHash;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::crypto::SessionPrivateKey;
use crate::discovery::source::{BlockRef, ChainSource};
use crate::discovery::{DiscoveryError, DiscoveryResult};
use crate::gossip::{self, EnvelopeError, GossipAddress, TunnelUrl};
use crate::observability::metrics;

/// One discovery session: a chain connection, the channel address, and the
/// session's private key.
///
/// Each watcher owns its own subscription; nothing is shared between
/// sessions.
pub struct ChainWatcher<S> {
    source: Arc<S>,
    gossip: GossipAddress,
    private_key: SessionPrivateKey,
    deadline: Option<Duration>,
}

impl<S: ChainSource + 'static> ChainWatcher<S> {
    pub fn new(source: S, gossip: GossipAddress, private_key: SessionPrivateKey) -> Self {
        Self {
            source: Arc::new(source),
            gossip,
            private_key,
            deadline: None,
        }
    }

    /// Fail with [`DiscoveryError::Timeout`] if nothing resolves in time.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Run until resolved or failed. Consumes the watcher, so the connection
    /// is released on return.
    pub async fn discover(self) -> DiscoveryResult<TunnelUrl> {
        self.discover_until(std::future::pending()).await
    }

    /// Like [`discover`](Self::discover), but gives up with
    /// [`DiscoveryError::Cancelled`] as soon as `cancel` completes.
    pub async fn discover_until<C>(self, cancel: C) -> DiscoveryResult<TunnelUrl>
    where
        C: Future<Output = ()> + Send,
    {
        let session = uuid::Uuid::new_v4();
        let span = tracing::info_span!("discovery", session = %session, gossip = %self.gossip);

        async move {
            tracing::info!(deadline = ?self.deadline, "Waiting for tunnel URL");

            let bounded = async {
                match self.deadline {
                    Some(deadline) => tokio::time::timeout(deadline, self.watch())
                        .await
                        .unwrap_or(Err(DiscoveryError::Timeout(deadline))),
                    None => self.watch().await,
                }
            };

            let result = tokio::select! {
                biased;
                _ = cancel => Err(DiscoveryError::Cancelled),
                result = bounded => result,
            };

            match &result {
                Ok(url) => {
                    metrics::record_discovery("resolved");
                    tracing::info!(url = %url, "Tunnel URL resolved");
                }
                Err(DiscoveryError::Timeout(_)) => {
                    metrics::record_discovery("timeout");
                    tracing::warn!("Tunnel discovery timed out");
                }
                Err(DiscoveryError::Cancelled) => {
                    metrics::record_discovery("cancelled");
                    tracing::info!("Tunnel discovery cancelled");
                }
                Err(e) => {
                    metrics::record_discovery("failed");
                    tracing::error!(error = %e, "Tunnel discovery failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Spawn discovery in the background.
    ///
    /// The returned handle stops it explicitly or when dropped.
    pub fn start(self) -> Discovery {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.discover_until(async move {
            // Fires on stop() and when the handle is dropped.
            let _ = stop_rx.await;
        }));

        Discovery {
            stop: Some(stop_tx),
            task,
        }
    }

    /// Subscribed → Scanning → Resolved | Failed.
    ///
    /// The block stream lives only inside this call: returning drops it,
    /// which unsubscribes before any later block can be scanned.
    async fn watch(&self) -> DiscoveryResult<TunnelUrl> {
        let mut blocks = self.source.subscribe_blocks().await?;
        tracing::debug!("Subscribed to new blocks");

        while let Some(next) = blocks.next().await {
            let block = next?;
            if let Some(url) = self.scan_block(block).await {
                return Ok(url);
            }
        }

        Err(DiscoveryError::Subscription(
            "block subscription closed".to_string(),
        ))
    }

    /// Check every transaction of `block` concurrently; first hit wins.
    async fn scan_block(&self, block: BlockRef) -> Option<TunnelUrl> {
        metrics::record_block_scanned();

        let hashes = match self.source.block_transactions(block).await {
            Ok(hashes) => hashes,
            Err(e) => {
                tracing::warn!(block = block.number, error = %e, "Skipping block");
                return None;
            }
        };
        tracing::trace!(block = block.number, transactions = hashes.len(), "Scanning block");

        let mut checks: FuturesUnordered<_> = hashes
            .into_iter()
            .map(|hash| self.check_transaction(hash))
            .collect();

        while let Some(found) = checks.next().await {
            if found.is_some() {
                return found;
            }
        }
        None
    }

    async fn check_transaction(&self, hash: TxHash) -> Option<TunnelUrl> {
        let tx = match self.source.transaction(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(tx_hash = %hash, error = %e, "Skipping transaction");
                return None;
            }
        };

        if !self.gossip.accepts(tx.from, tx.to) {
            return None;
        }
        metrics::record_candidate();

        match gossip::open(&tx.input, &self.private_key) {
            Ok(url) => {
                tracing::debug!(tx_hash = %hash, "Gossip payload decrypted");
                Some(url)
            }
            Err(e) => {
                // Routine: another session's payload, or junk on the channel.
                metrics::record_payload_skipped(skip_reason(&e));
                tracing::debug!(tx_hash = %hash, reason = %e, "Gossip payload not for this session");
                None
            }
        }
    }
}

fn skip_reason(error: &EnvelopeError) -> &'static str {
    match error {
        EnvelopeError::Crypto(_) => "undecryptable",
        EnvelopeError::Malformed(_) => "malformed",
        EnvelopeError::InvalidUrl(_) => "invalid_url",
    }
}

impl<S> std::fmt::Debug for ChainWatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainWatcher")
            .field("gossip", &self.gossip)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Handle to a discovery running in the background.
#[derive(Debug)]
pub struct Discovery {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<DiscoveryResult<TunnelUrl>>,
}

impl Discovery {
    /// Ask the discovery to stop; [`wait`](Self::wait) then returns
    /// [`DiscoveryError::Cancelled`] unless it had already finished.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the outcome.
    pub async fn wait(mut self) -> DiscoveryResult<TunnelUrl> {
        // Keep the stop sender alive while waiting; dropping it would cancel.
        let _stop = self.stop.take();
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => Err(DiscoveryError::Task(e.to_string())),
        }
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.stop();
    }
}
