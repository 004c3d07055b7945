//! Keccak commitments over fixed-layout, big-endian encodings of the fields
//! two providers are expected to agree on.
//!
//! Transaction: `chainId[8] || txHash[32] || blockNumber[8] || status[1] || gasUsed[8]`
//!
//! Header: `chainId[8] || number[8] || hash[32] || parentHash[32] || stateRoot[32]
//! || receiptsRoot[32] || transactionsRoot[32] || timestamp[8]`

use std::fmt;

use ethers_core::{types::H256, utils::keccak256};
use serde::Serialize;

use crate::{
    error::{LensError, LensResult},
    models::{BlockHeaderView, ReceiptView},
};

const TX_ENCODING_LEN: usize = 8 + 32 + 8 + 1 + 8;
const HEADER_ENCODING_LEN: usize = 8 + 8 + 32 * 5 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitmentDigest(H256);

impl fmt::Display for CommitmentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

pub fn encode_tx(
    chain_id: u64,
    tx_hash: H256,
    block_number: u64,
    status: u8,
    gas_used: u64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(TX_ENCODING_LEN);
    buf.extend_from_slice(&chain_id.to_be_bytes());
    buf.extend_from_slice(tx_hash.as_bytes());
    buf.extend_from_slice(&block_number.to_be_bytes());
    buf.push(status);
    buf.extend_from_slice(&gas_used.to_be_bytes());
    buf
}

pub fn encode_header(chain_id: u64, header: &BlockHeaderView) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_ENCODING_LEN);
    buf.extend_from_slice(&chain_id.to_be_bytes());
    buf.extend_from_slice(&header.number.to_be_bytes());
    for root in [
        header.hash,
        header.parent_hash,
        header.state_root,
        header.receipts_root,
        header.transactions_root,
    ] {
        buf.extend_from_slice(root.as_bytes());
    }
    buf.extend_from_slice(&header.timestamp.to_be_bytes());
    buf
}

/// Commitment of a mined transaction's receipt.
///
/// Fails with [`LensError::Pending`] when the receipt has no block yet.
pub fn commit_tx(
    chain_id: u64,
    tx_hash: H256,
    receipt: &ReceiptView,
) -> LensResult<CommitmentDigest> {
    let block_number = receipt
        .block_number
        .ok_or_else(|| LensError::Pending(format!("transaction {:#x}", tx_hash)))?;
    let encoded = encode_tx(chain_id, tx_hash, block_number, receipt.status, receipt.gas_used);
    Ok(CommitmentDigest(H256(keccak256(encoded))))
}

pub fn commit_header(chain_id: u64, header: &BlockHeaderView) -> CommitmentDigest {
    CommitmentDigest(H256(keccak256(encode_header(chain_id, header))))
}
