use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::types::H256;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::warn;

use crate::{
    error::{LensError, LensResult},
    models::{BlockView, RawTransaction, ReceiptView},
    rpc_stats::{RpcEvent, RpcStats},
};

/// The chain queries every analysis is built from.
///
/// Implementations either answer or fail with a terminal [`LensError`];
/// absence of the requested object is `Ok(None)`, not an error.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn chain_id(&self) -> LensResult<u64>;

    async fn block_number(&self) -> LensResult<u64>;

    async fn block(&self, id: BlockRef, include_transactions: bool)
        -> LensResult<Option<BlockView>>;

    async fn transaction(&self, hash: H256) -> LensResult<Option<RawTransaction>>;

    async fn receipt(&self, hash: H256) -> LensResult<Option<ReceiptView>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Finalized,
    Safe,
    Pending,
    Earliest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Tag(BlockTag),
}

impl BlockRef {
    pub const LATEST: Self = Self::Tag(BlockTag::Latest);
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Tag(BlockTag::Latest) => f.write_str("latest"),
            Self::Tag(BlockTag::Finalized) => f.write_str("finalized"),
            Self::Tag(BlockTag::Safe) => f.write_str("safe"),
            Self::Tag(BlockTag::Pending) => f.write_str("pending"),
            Self::Tag(BlockTag::Earliest) => f.write_str("earliest"),
        }
    }
}

impl FromStr for BlockRef {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let tag = match raw.to_ascii_lowercase().as_str() {
            "latest" => Some(BlockTag::Latest),
            "finalized" => Some(BlockTag::Finalized),
            "safe" => Some(BlockTag::Safe),
            "pending" => Some(BlockTag::Pending),
            "earliest" => Some(BlockTag::Earliest),
            _ => None,
        };
        if let Some(tag) = tag {
            return Ok(Self::Tag(tag));
        }

        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => raw.parse::<u64>(),
        };
        parsed
            .map(Self::Number)
            .map_err(|_| LensError::InvalidInput(format!("invalid block identifier {:?}", s)))
    }
}

/// Parse a `0x`-prefixed, 64 hex digit transaction hash.
pub fn parse_tx_hash(raw: &str) -> LensResult<H256> {
    let trimmed = raw.trim();
    let invalid = || LensError::InvalidInput(format!("invalid transaction hash {:?}", raw));

    if trimmed.len() != 66 {
        return Err(invalid());
    }
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    H256::from_str(digits).map_err(|_| invalid())
}

/// Fixed-delay retry applied to every call of a wrapped gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, the first one included.
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    pub const fn no_retry() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Wraps a gateway so each call is retried on RPC failures.
///
/// Not-found and pending outcomes pass straight through; only
/// [`LensError::is_retryable`] errors are retried.
#[derive(Debug)]
pub struct RetryingGateway<G> {
    inner: G,
    policy: RetryPolicy,
    stats: RpcStats,
}

impl<G> RetryingGateway<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            stats: RpcStats::default(),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn stats(&self) -> &RpcStats {
        &self.stats
    }

    async fn with_retry<T, F, Fut>(&self, call: &'static str, mut op: F) -> LensResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = LensResult<T>> + Send,
    {
        self.stats.record(RpcEvent::Call);
        let strategy = FixedInterval::new(self.policy.delay)
            .take(self.policy.attempts.saturating_sub(1));

        let mut attempt = 0usize;
        let result = RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                if attempt > 1 {
                    self.stats.record(RpcEvent::Retry);
                    warn!(call, attempt, max = self.policy.attempts, "retrying rpc call");
                }
                op()
            },
            LensError::is_retryable,
        )
        .await;

        if result.is_err() {
            self.stats.record(RpcEvent::Failure);
        }
        result
    }
}

#[async_trait]
impl<G: ChainGateway> ChainGateway for RetryingGateway<G> {
    async fn chain_id(&self) -> LensResult<u64> {
        self.with_retry("eth_chainId", || self.inner.chain_id()).await
    }

    async fn block_number(&self) -> LensResult<u64> {
        self.with_retry("eth_blockNumber", || self.inner.block_number())
            .await
    }

    async fn block(
        &self,
        id: BlockRef,
        include_transactions: bool,
    ) -> LensResult<Option<BlockView>> {
        self.with_retry("eth_getBlockByNumber", || {
            self.inner.block(id, include_transactions)
        })
        .await
    }

    async fn transaction(&self, hash: H256) -> LensResult<Option<RawTransaction>> {
        self.with_retry("eth_getTransactionByHash", || self.inner.transaction(hash))
            .await
    }

    async fn receipt(&self, hash: H256) -> LensResult<Option<ReceiptView>> {
        self.with_retry("eth_getTransactionReceipt", || self.inner.receipt(hash))
            .await
    }
}
