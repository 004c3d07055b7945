use chrono::{DateTime, Utc};
use ethers_core::types::{Address, H256, U256};
use tracing::debug;

use crate::{
    block_cache::BlockCache,
    error::{LensError, LensResult},
    fees::{classify, wei_to_eth, wei_to_gwei, TxType},
    gateway::{BlockRef, ChainGateway},
    models::{BlockHeaderView, RawTransaction, ReceiptView, TransactionSummary},
    network::NetworkNames,
};

/// Chain id, head and wall clock read once and shared by a run of summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChainFacts {
    chain_id: u64,
    latest: u64,
    now: DateTime<Utc>,
}

/// State shared by the summaries of one batch: the chain id and head are
/// read once, and each containing block is fetched once.
#[derive(Debug)]
pub struct SummaryContext {
    facts: ChainFacts,
    blocks: BlockCache,
}

impl SummaryContext {
    /// Reads the chain id, then the latest block number.
    pub async fn load<G: ChainGateway>(gateway: &G) -> LensResult<Self> {
        let chain_id = gateway.chain_id().await?;
        let latest = gateway.block_number().await?;
        Ok(Self {
            facts: ChainFacts {
                chain_id,
                latest,
                now: Utc::now(),
            },
            blocks: BlockCache::default(),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.facts.chain_id
    }

    pub fn latest(&self) -> u64 {
        self.facts.latest
    }

    /// Distinct blocks fetched so far.
    pub fn cached_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// A transaction with its receipt, both known to be mined.
struct MinedTx {
    tx_hash: H256,
    tx: RawTransaction,
    receipt: ReceiptView,
    block_number: u64,
}

/// Builds a [`TransactionSummary`] for one mined transaction.
#[derive(Debug, Clone, Default)]
pub struct TxSummarizer {
    networks: NetworkNames,
}

impl TxSummarizer {
    pub fn new(networks: NetworkNames) -> Self {
        Self { networks }
    }

    /// Queries, in order: chain id, transaction, receipt, the receipt's block
    /// and the latest block number.
    ///
    /// Confirmations come from the head read at call time, so a reorg between
    /// calls can only make them smaller, never negative.
    pub async fn summarize<G: ChainGateway>(
        &self,
        gateway: &G,
        tx_hash: H256,
    ) -> LensResult<TransactionSummary> {
        let chain_id = gateway.chain_id().await?;
        let mined = fetch_mined(gateway, tx_hash).await?;
        let block = gateway
            .block(BlockRef::Number(mined.block_number), false)
            .await?
            .ok_or_else(|| LensError::NotFound(format!("block {}", mined.block_number)))?;
        let latest = gateway.block_number().await?;

        let facts = ChainFacts {
            chain_id,
            latest,
            now: Utc::now(),
        };
        Ok(self.build(facts, mined, &block.header))
    }

    /// Like [`summarize`](Self::summarize), but takes the chain id and head
    /// from `context` and reuses blocks it already holds.
    pub async fn summarize_in<G: ChainGateway>(
        &self,
        gateway: &G,
        tx_hash: H256,
        context: &mut SummaryContext,
    ) -> LensResult<TransactionSummary> {
        let mined = fetch_mined(gateway, tx_hash).await?;
        let facts = context.facts;
        let block = context
            .blocks
            .get_or_fetch(gateway, mined.block_number, false)
            .await?;
        Ok(self.build(facts, mined, &block.header))
    }

    fn build(
        &self,
        facts: ChainFacts,
        mined: MinedTx,
        header: &BlockHeaderView,
    ) -> TransactionSummary {
        let MinedTx {
            tx_hash,
            tx,
            receipt,
            block_number,
        } = mined;
        debug!(tx = ?tx_hash, block_number, latest = facts.latest, "resolved transaction context");

        let base_fee = header.base_fee_per_gas_wei;
        let fees = classify(&tx, Some(base_fee));
        let effective_wei = receipt.effective_price_wei.unwrap_or(fees.effective_wei);
        let total_fee_wei = U256::from(receipt.gas_used).saturating_mul(effective_wei);
        let parties = Parties::resolve(&receipt, &tx);
        let gas_limit = gas_limit(&tx);

        TransactionSummary {
            network: self.networks.label(facts.chain_id),
            chain_id: facts.chain_id,
            tx_hash,
            from: parties.from,
            to: parties.to,
            status: receipt.status,
            tx_type: TxType::from_tag(tx.tx_type).to_string(),
            block_number,
            timestamp: header.timestamp,
            timestamp_utc: timestamp_utc(header.timestamp),
            age_minutes: age_minutes(header.timestamp, facts.now),
            confirmations: confirmations(facts.latest, block_number),
            miner: header.miner,
            value_eth: wei_to_eth(tx.value),
            gas_used: receipt.gas_used,
            gas_limit,
            gas_efficiency_pct: gas_limit
                .map(|limit| receipt.gas_used as f64 / limit as f64 * 100.0),
            effective_gas_price_gwei: wei_to_gwei(effective_wei),
            base_fee_at_tx_gwei: wei_to_gwei(base_fee),
            tip_at_tx_gwei: wei_to_gwei(fees.tip_wei),
            total_fee_eth: wei_to_eth(total_fee_wei),
        }
    }
}

/// Transaction then receipt; fails unless both place it in a block.
async fn fetch_mined<G: ChainGateway>(gateway: &G, tx_hash: H256) -> LensResult<MinedTx> {
    let label = format!("transaction {:#x}", tx_hash);
    let tx = gateway
        .transaction(tx_hash)
        .await?
        .ok_or_else(|| LensError::NotFound(label.clone()))?;
    if tx.block_number.is_none() {
        return Err(LensError::Pending(label));
    }

    let receipt = gateway
        .receipt(tx_hash)
        .await?
        .ok_or_else(|| LensError::ReceiptUnavailable(format!("{:#x}", tx_hash)))?;
    let block_number = receipt
        .block_number
        .ok_or_else(|| LensError::ReceiptUnavailable(format!("{:#x}", tx_hash)))?;

    Ok(MinedTx {
        tx_hash,
        tx,
        receipt,
        block_number,
    })
}

/// Sender and recipient, receipt first and transaction as fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parties {
    from: Address,
    to: Option<Address>,
}

impl Parties {
    fn resolve(receipt: &ReceiptView, tx: &RawTransaction) -> Self {
        Self {
            from: receipt.from.unwrap_or(tx.from),
            to: receipt.to.or(tx.to),
        }
    }
}

pub fn confirmations(latest: u64, block_number: u64) -> u64 {
    latest.saturating_sub(block_number)
}

/// A zero gas limit means the endpoint did not report one.
fn gas_limit(tx: &RawTransaction) -> Option<u64> {
    if tx.gas.is_zero() {
        return None;
    }
    Some(u64::try_from(tx.gas).unwrap_or(u64::MAX))
}

/// Minutes between the block timestamp and `now`, floored at zero for
/// clocks running behind the chain.
pub fn age_minutes(timestamp: u64, now: DateTime<Utc>) -> Option<f64> {
    let mined_at = timestamp_utc(timestamp)?;
    let seconds = (now - mined_at).num_seconds().max(0);
    Some(seconds as f64 / 60.0)
}

fn timestamp_utc(timestamp: u64) -> Option<DateTime<Utc>> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
