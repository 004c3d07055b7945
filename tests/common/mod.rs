#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers_core::types::{Address, H256, U256};
use ethers_providers::ProviderError;

use eth_fee_lens::{
    gateway::BlockTag,
    models::{BlockHeaderView, BlockView, RawTransaction, ReceiptView},
    BlockRef, ChainGateway, LensError, LensResult,
};

pub fn gwei(n: u64) -> U256 {
    U256::from(n) * U256::exp10(9)
}

/// Recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ChainId,
    BlockNumber,
    Block(BlockRef, bool),
    Transaction(H256),
    Receipt(H256),
}

/// In-memory chain: blocks by number, transactions and receipts by hash.
#[derive(Debug, Default)]
pub struct MockGateway {
    pub chain_id: u64,
    pub head: u64,
    pub blocks: HashMap<u64, BlockView>,
    pub transactions: HashMap<H256, RawTransaction>,
    pub receipts: HashMap<H256, ReceiptView>,
    /// Number of upcoming calls that fail with an RPC error.
    pub failures_left: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl MockGateway {
    pub fn new(chain_id: u64, head: u64) -> Self {
        Self {
            chain_id,
            head,
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: BlockView) -> Self {
        self.blocks.insert(block.header.number, block);
        self
    }

    pub fn with_transaction(mut self, tx: RawTransaction) -> Self {
        self.transactions.insert(tx.hash, tx);
        self
    }

    pub fn with_receipt(mut self, receipt: ReceiptView) -> Self {
        self.receipts.insert(receipt.tx_hash, receipt);
        self
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn block_fetches(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Block(BlockRef::Number(n), _) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> LensResult<()> {
        self.calls.lock().unwrap().push(call);
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LensError::rpc(
                "mock",
                ProviderError::CustomError("connection refused".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn chain_id(&self) -> LensResult<u64> {
        self.record(Call::ChainId)?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> LensResult<u64> {
        self.record(Call::BlockNumber)?;
        Ok(self.head)
    }

    async fn block(
        &self,
        id: BlockRef,
        include_transactions: bool,
    ) -> LensResult<Option<BlockView>> {
        self.record(Call::Block(id, include_transactions))?;
        let number = match id {
            BlockRef::Number(n) => n,
            BlockRef::Tag(BlockTag::Earliest) => 0,
            BlockRef::Tag(BlockTag::Pending) => {
                return Err(LensError::Pending("block".to_string()))
            }
            BlockRef::Tag(_) => self.head,
        };
        Ok(self.blocks.get(&number).map(|block| {
            let mut block = block.clone();
            if !include_transactions {
                block.transactions.clear();
            }
            block
        }))
    }

    async fn transaction(&self, hash: H256) -> LensResult<Option<RawTransaction>> {
        self.record(Call::Transaction(hash))?;
        Ok(self.transactions.get(&hash).cloned())
    }

    async fn receipt(&self, hash: H256) -> LensResult<Option<ReceiptView>> {
        self.record(Call::Receipt(hash))?;
        Ok(self.receipts.get(&hash).cloned())
    }
}

pub fn header(number: u64, base_fee: U256, timestamp: u64) -> BlockHeaderView {
    BlockHeaderView {
        number,
        hash: H256::from_low_u64_be(number),
        parent_hash: H256::from_low_u64_be(number.saturating_sub(1)),
        state_root: H256::repeat_byte(0x51),
        receipts_root: H256::repeat_byte(0x52),
        transactions_root: H256::repeat_byte(0x53),
        timestamp,
        base_fee_per_gas_wei: base_fee,
        miner: Some(Address::from_low_u64_be(0xbeef)),
    }
}

pub fn block(number: u64, base_fee: U256, timestamp: u64, txs: Vec<RawTransaction>) -> BlockView {
    BlockView {
        header: header(number, base_fee, timestamp),
        transactions: txs,
    }
}

pub fn legacy_tx(hash: H256, gas_price: U256, block_number: Option<u64>) -> RawTransaction {
    RawTransaction {
        hash,
        from: Address::from_low_u64_be(1),
        to: Some(Address::from_low_u64_be(2)),
        gas: U256::from(42_000u64),
        gas_price: Some(gas_price),
        tx_type: Some(0),
        block_number,
        ..Default::default()
    }
}

pub fn fee_market_tx(
    hash: H256,
    max_fee: U256,
    priority: U256,
    block_number: Option<u64>,
) -> RawTransaction {
    RawTransaction {
        hash,
        from: Address::from_low_u64_be(1),
        to: Some(Address::from_low_u64_be(2)),
        gas: U256::from(42_000u64),
        max_fee_per_gas: Some(max_fee),
        max_priority_fee_per_gas: Some(priority),
        tx_type: Some(2),
        block_number,
        ..Default::default()
    }
}

pub fn receipt(hash: H256, block_number: u64, status: u8, gas_used: u64) -> ReceiptView {
    ReceiptView {
        tx_hash: hash,
        from: None,
        to: None,
        status,
        gas_used,
        block_number: Some(block_number),
        effective_price_wei: None,
    }
}
