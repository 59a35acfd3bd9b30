//! Shared utilities for integration tests: an in-memory chain, a gossip
//! sender that mines into it, and a scripted HTTP endpoint.

#![allow(dead_code)]

use alloy::primitives::{Address, BlockHash, Bytes, TxHash, B256};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tunnel_gossip::discovery::{
    BlockRef, BlockStream, ChainSource, ChainTransaction, DiscoveryError, DiscoveryResult,
};
use tunnel_gossip::gossip::GossipAddress;
use tunnel_gossip::tunnel::{GossipSender, PublishError};

/// An unmined transaction.
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
}

impl PendingTx {
    pub fn new(from: Address, to: Option<Address>, input: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            input: input.into(),
        }
    }

    /// Self-transaction of `account`, the shape the gossip channel uses.
    pub fn to_self(account: Address, input: impl Into<Bytes>) -> Self {
        Self::new(account, Some(account), input)
    }
}

#[derive(Default)]
struct ChainState {
    height: u64,
    next_tx: u64,
    blocks: HashMap<BlockHash, Vec<TxHash>>,
    transactions: HashMap<TxHash, ChainTransaction>,
    subscribers: Vec<mpsc::UnboundedSender<DiscoveryResult<BlockRef>>>,
    tx_fetches: HashMap<TxHash, usize>,
    block_fetches: HashMap<u64, usize>,
    failing_blocks: Vec<u64>,
}

/// In-memory chain with block subscriptions. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mine a block holding `txs` and notify live subscribers.
    pub fn mine_block(&self, txs: Vec<PendingTx>) -> (BlockRef, Vec<TxHash>) {
        let mut state = self.state.lock().unwrap();
        state.height += 1;
        let block = BlockRef {
            number: state.height,
            hash: B256::left_padding_from(&state.height.to_be_bytes()),
        };

        let mut hashes = Vec::with_capacity(txs.len());
        for tx in txs {
            state.next_tx += 1;
            let mut raw = [0xaa_u8; 32];
            raw[24..].copy_from_slice(&state.next_tx.to_be_bytes());
            let hash = TxHash::from(raw);
            state.transactions.insert(
                hash,
                ChainTransaction {
                    hash,
                    from: tx.from,
                    to: tx.to,
                    input: tx.input,
                },
            );
            hashes.push(hash);
        }
        state.blocks.insert(block.hash, hashes.clone());
        state.subscribers.retain(|sub| sub.send(Ok(block)).is_ok());

        (block, hashes)
    }

    /// Push a subscription error to every subscriber.
    pub fn fail_subscribers(&self, reason: &str) {
        let mut state = self.state.lock().unwrap();
        for sub in state.subscribers.drain(..) {
            let _ = sub.send(Err(DiscoveryError::Subscription(reason.to_string())));
        }
    }

    /// End every subscription stream.
    pub fn close_subscribers(&self) {
        self.state.lock().unwrap().subscribers.clear();
    }

    /// Make fetching the transactions of block `number` fail.
    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().failing_blocks.push(number);
    }

    /// Subscribers whose stream is still being read.
    pub fn live_subscribers(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.subscribers.iter().filter(|sub| !sub.is_closed()).count()
    }

    pub fn height(&self) -> u64 {
        self.state.lock().unwrap().height
    }

    pub fn transaction_fetches(&self, hash: TxHash) -> usize {
        self.state.lock().unwrap().tx_fetches.get(&hash).copied().unwrap_or(0)
    }

    pub fn block_fetches(&self, number: u64) -> usize {
        self.state.lock().unwrap().block_fetches.get(&number).copied().unwrap_or(0)
    }

    /// Wait until `count` subscribers are listening.
    pub async fn wait_for_subscribers(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.live_subscribers() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscribers never arrived");
    }

    /// Wait until nobody is subscribed any more.
    pub async fn wait_for_unsubscribed(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.live_subscribers() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription was never released");
    }
}

impl ChainSource for MemoryChain {
    async fn subscribe_blocks(&self) -> DiscoveryResult<BlockStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.push(tx);

        let blocks = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(blocks.boxed())
    }

    async fn block_transactions(&self, block: BlockRef) -> DiscoveryResult<Vec<TxHash>> {
        let mut state = self.state.lock().unwrap();
        *state.block_fetches.entry(block.number).or_default() += 1;
        if state.failing_blocks.contains(&block.number) {
            return Err(DiscoveryError::Fetch(format!("block {} unavailable", block.number)));
        }
        state
            .blocks
            .get(&block.hash)
            .cloned()
            .ok_or_else(|| DiscoveryError::Fetch(format!("block {} not found", block.number)))
    }

    async fn transaction(&self, hash: TxHash) -> DiscoveryResult<Option<ChainTransaction>> {
        let mut state = self.state.lock().unwrap();
        *state.tx_fetches.entry(hash).or_default() += 1;
        Ok(state.transactions.get(&hash).cloned())
    }
}

/// Gossip sender that mines each payload as a self-transaction of the
/// gossip account on a [`MemoryChain`].
#[derive(Clone)]
pub struct MemoryGossipSender {
    chain: MemoryChain,
    account: Address,
}

impl MemoryGossipSender {
    pub fn new(chain: MemoryChain, account: Address) -> Self {
        Self { chain, account }
    }
}

impl GossipSender for MemoryGossipSender {
    fn gossip_address(&self) -> GossipAddress {
        GossipAddress::new(self.account)
    }

    async fn send_gossip(&self, payload: Bytes) -> Result<TxHash, PublishError> {
        let (_, hashes) = self.chain.mine_block(vec![PendingTx::to_self(self.account, payload)]);
        Ok(hashes[0])
    }
}

/// A request captured by [`start_scripted_backend`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

/// Start a local HTTP endpoint answering every request with `status` and
/// the JSON `body`. Returns its address and the requests it received.
pub async fn start_scripted_backend(
    status: u16,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<CapturedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let log = captured.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let log = log.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                log.lock().unwrap().push(request);

                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, captured)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(split) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..split]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = split + 4;
        if buf.len() >= body_start + content_length {
            let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();
            return Some(CapturedRequest { head, body });
        }
    }
}

/// A reqwest client that ignores proxy settings from the environment.
pub fn direct_http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
