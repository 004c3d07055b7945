use std::fmt;

use ethers_core::types::U256;

use crate::models::RawTransaction;

const GWEI_DECIMALS: i32 = 9;
const ETHER_DECIMALS: i32 = 18;

/// Fee model of a transaction, keyed off the envelope type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    AccessList,
    FeeMarket,
    Unknown(u64),
}

impl TxType {
    /// A missing tag is a pre-typed legacy transaction.
    pub fn from_tag(tag: Option<u64>) -> Self {
        match tag {
            None | Some(0) => Self::Legacy,
            Some(1) => Self::AccessList,
            Some(2) => Self::FeeMarket,
            Some(other) => Self::Unknown(other),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("Legacy"),
            Self::AccessList => f.write_str("AccessList"),
            Self::FeeMarket => f.write_str("EIP-1559"),
            Self::Unknown(tag) => write!(f, "Unknown({})", tag),
        }
    }
}

/// Effective per-gas price and priority tip, both in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeBreakdown {
    pub effective_wei: U256,
    pub tip_wei: U256,
}

/// Derive the effective price and tip a transaction paid in a block with
/// the given base fee.
///
/// Fee-market transactions pay `min(maxFee, baseFee + maxPriorityFee)` and tip
/// `maxPriorityFee`. Everything else, unknown tags included, pays `gasPrice`
/// and tips whatever sits above the base fee, floored at zero.
pub fn classify(tx: &RawTransaction, base_fee: Option<U256>) -> FeeBreakdown {
    let base_fee = base_fee.unwrap_or_default();
    match TxType::from_tag(tx.tx_type) {
        TxType::FeeMarket => {
            let max_fee = tx.max_fee_per_gas.unwrap_or_default();
            let priority = tx.max_priority_fee_per_gas.unwrap_or_default();
            FeeBreakdown {
                effective_wei: max_fee.min(base_fee.saturating_add(priority)),
                tip_wei: priority,
            }
        }
        TxType::Legacy | TxType::AccessList | TxType::Unknown(_) => {
            let gas_price = tx.gas_price.unwrap_or_default();
            FeeBreakdown {
                effective_wei: gas_price,
                tip_wei: gas_price.saturating_sub(base_fee),
            }
        }
    }
}

pub fn wei_to_gwei(wei: U256) -> f64 {
    scale_down(wei, GWEI_DECIMALS)
}

pub fn wei_to_eth(wei: U256) -> f64 {
    scale_down(wei, ETHER_DECIMALS)
}

fn scale_down(wei: U256, decimals: i32) -> f64 {
    u256_to_f64_lossy(wei) / 10f64.powi(decimals)
}

fn u256_to_f64_lossy(value: U256) -> f64 {
    match u128::try_from(value) {
        Ok(v) => v as f64,
        // Past u128 the decimal string still parses to the nearest f64.
        Err(_) => value.to_string().parse().unwrap_or(f64::MAX),
    }
}
