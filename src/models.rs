use chrono::{DateTime, Utc};
use ethers_core::types::{Address, H256, U256};
use serde::Serialize;

/// Transaction fields as reported by `eth_getTransactionByHash` or a full block body.
#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub tx_type: Option<u64>,
    /// `None` while the transaction sits in the mempool.
    pub block_number: Option<u64>,
}

/// Post-execution record of a transaction.
///
/// `from`/`to` are optional because not every client includes them in
/// receipts; the transaction object is the fallback source.
#[derive(Debug, Clone, Default)]
pub struct ReceiptView {
    pub tx_hash: H256,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub status: u8,
    pub gas_used: u64,
    pub block_number: Option<u64>,
    pub effective_price_wei: Option<U256>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeaderView {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub state_root: H256,
    pub receipts_root: H256,
    pub transactions_root: H256,
    pub timestamp: u64,
    /// Zero on blocks produced before the fee market existed.
    pub base_fee_per_gas_wei: U256,
    pub miner: Option<Address>,
}

/// A header plus, when requested, the full transaction bodies.
#[derive(Debug, Clone, Default)]
pub struct BlockView {
    pub header: BlockHeaderView,
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub network: String,
    pub chain_id: u64,
    pub tx_hash: H256,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub status: u8,
    pub tx_type: String,
    pub block_number: u64,
    pub timestamp: u64,
    pub timestamp_utc: Option<DateTime<Utc>>,
    pub age_minutes: Option<f64>,
    pub confirmations: u64,
    pub miner: Option<Address>,
    pub value_eth: f64,
    pub gas_used: u64,
    pub gas_limit: Option<u64>,
    #[serde(rename = "gasEfficiency")]
    pub gas_efficiency_pct: Option<f64>,
    #[serde(rename = "gasPriceGwei")]
    pub effective_gas_price_gwei: f64,
    pub base_fee_at_tx_gwei: f64,
    pub tip_at_tx_gwei: f64,
    pub total_fee_eth: f64,
}

impl TransactionSummary {
    pub fn is_success(&self) -> bool {
        self.status == 1
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// A non-positive threshold disables the check.
    pub fn exceeds_fee_threshold(&self, threshold_eth: f64) -> bool {
        threshold_eth > 0.0 && self.total_fee_eth > threshold_eth
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PercentileSummary {
    pub p50: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipSummary {
    #[serde(flatten)]
    pub stats: PercentileSummary,
    pub count_zero: usize,
    pub zero_share_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeProfile {
    pub chain_id: u64,
    pub network: String,
    pub head: u64,
    pub sampled_blocks: u64,
    pub block_span: u64,
    pub step: u64,
    pub avg_block_time_sec: f64,
    /// Wall-clock time the run took.
    pub timing_sec: f64,
    pub base_fee_gwei: PercentileSummary,
    pub effective_price_gwei: PercentileSummary,
    pub tip_gwei_approx: TipSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total_fee_eth: f64) -> TransactionSummary {
        TransactionSummary {
            network: "Ethereum Mainnet".to_string(),
            chain_id: 1,
            tx_hash: H256::zero(),
            from: Address::zero(),
            to: None,
            status: 1,
            tx_type: "Legacy".to_string(),
            block_number: 100,
            timestamp: 0,
            timestamp_utc: None,
            age_minutes: None,
            confirmations: 0,
            miner: None,
            value_eth: 0.0,
            gas_used: 21_000,
            gas_limit: None,
            gas_efficiency_pct: None,
            effective_gas_price_gwei: 0.0,
            base_fee_at_tx_gwei: 0.0,
            tip_at_tx_gwei: 0.0,
            total_fee_eth,
        }
    }

    #[test]
    fn fee_threshold_is_strict_and_disabled_when_not_positive() {
        assert!(summary(0.06).exceeds_fee_threshold(0.05));
        assert!(!summary(0.05).exceeds_fee_threshold(0.05));
        assert!(!summary(10.0).exceeds_fee_threshold(0.0));
        assert!(!summary(10.0).exceeds_fee_threshold(-1.0));
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        assert!(summary(0.0).is_contract_creation());
        assert!(summary(0.0).is_success());
    }
}
