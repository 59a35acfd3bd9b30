//! Transaction building, signing, and confirmation monitoring.
//!
//! # Responsibilities
//! - Build legacy transactions with nonce sync and gas price limits
//! - Sign and broadcast
//! - Poll receipts until confirmed, reverted, or timed out

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};
use crate::blockchain::wallet::Wallet;

/// Intrinsic gas of a plain transfer.
const BASE_GAS: u64 = 21_000;

/// Calldata cost per byte (non-zero byte price, an upper bound).
const GAS_PER_DATA_BYTE: u64 = 16;

/// Transaction builder bound to one wallet.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    client: BlockchainClient,
    wallet: Wallet,
}

impl TxBuilder {
    pub fn new(client: BlockchainClient, wallet: Wallet) -> Self {
        Self { client, wallet }
    }

    /// Build a transaction request with nonce and gas filled in.
    pub async fn build(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> BlockchainResult<TransactionRequest> {
        // Sync nonce with the chain before every build
        let chain_nonce = self.client.get_transaction_count(self.wallet.address()).await?;
        self.wallet.set_nonce(chain_nonce);

        let gas_price = self.client.get_gas_price().await?;
        let gas_price_gwei = gas_price / 1_000_000_000;

        let config = self.client.config();
        if gas_price_gwei > config.max_gas_price_gwei as u128 {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei: config.max_gas_price_gwei,
            });
        }

        let adjusted_gas_price = (gas_price as f64 * config.gas_price_multiplier) as u128;
        let nonce = self.wallet.get_and_increment_nonce();
        let gas_limit = estimate_gas_limit(data.len());

        let tx = TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(to)
            .with_value(value)
            .with_input(data)
            .with_nonce(nonce)
            .with_gas_price(adjusted_gas_price)
            .with_chain_id(self.wallet.chain_id())
            .with_gas_limit(gas_limit);

        Ok(tx)
    }

    /// Build, sign, and broadcast. Returns as soon as a node accepts it.
    pub async fn send(&self, to: Address, data: Bytes) -> BlockchainResult<TxHash> {
        let request = self.build(to, U256::ZERO, data).await?;
        let envelope = self.wallet.sign_transaction(request).await?;
        let raw = envelope.encoded_2718();

        let tx_hash = self.client.send_raw_transaction(&raw).await?;
        tracing::info!(tx_hash = %tx_hash, from = %self.wallet.address(), "Transaction broadcast");
        Ok(tx_hash)
    }

    /// Wait until the transaction is mined with the configured depth.
    ///
    /// One confirmation means "included in a block". RPC failures while
    /// polling are logged and retried until `timeout_secs` runs out.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        timeout_secs: u64,
    ) -> BlockchainResult<ConfirmationStatus> {
        let poll_interval = Duration::from_millis(self.client.config().confirmation_poll_ms.max(1));

        settle(
            tx_hash,
            move || self.poll_confirmation(tx_hash),
            poll_interval,
            Duration::from_secs(timeout_secs),
        )
        .await
    }

    /// One receipt check. `Ok(None)` while pending or not deep enough.
    async fn poll_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<Option<ConfirmationStatus>> {
        let required_confirmations = self.client.confirmation_blocks().max(1);

        let receipt = match self.client.get_transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => {
                tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                return Ok(None);
            }
        };

        if !receipt.status() {
            return Ok(Some(ConfirmationStatus::Failed("Transaction reverted".to_string())));
        }

        let current_block = self.client.get_block_number().await?;
        let tx_block = receipt.block_number.unwrap_or(current_block);
        let confirmations = confirmations(tx_block, current_block);

        if confirmations >= required_confirmations {
            return Ok(Some(ConfirmationStatus::Confirmed {
                block_number: tx_block,
            }));
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            confirmations = confirmations,
            required = required_confirmations,
            "Waiting for confirmations"
        );
        Ok(None)
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}

/// Run `poll` every `poll_interval` until it settles or `deadline` passes.
async fn settle<F, Fut>(
    tx_hash: TxHash,
    mut poll: F,
    poll_interval: Duration,
    deadline: Duration,
) -> BlockchainResult<ConfirmationStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BlockchainResult<Option<ConfirmationStatus>>>,
{
    let result = timeout(deadline, async {
        let mut ticker = interval(poll_interval);
        loop {
            ticker.tick().await;
            match poll().await {
                Ok(Some(status)) => return status,
                Ok(None) => {}
                // The transaction may already be mined; only the deadline gives up.
                Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Confirmation poll failed"),
            }
        }
    })
    .await;

    result.map_err(|_| BlockchainError::ConfirmationTimeout {
        tx_hash: tx_hash.to_string(),
        timeout_secs: deadline.as_secs(),
    })
}

fn estimate_gas_limit(data_len: usize) -> u64 {
    BASE_GAS + data_len as u64 * GAS_PER_DATA_BYTE
}

fn confirmations(tx_block: u64, current_block: u64) -> u32 {
    if current_block < tx_block {
        return 0;
    }
    (current_block - tx_block + 1).min(u32::MAX as u64) as u32
}
