use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers_core::types::{
    Block, BlockId, BlockNumber, Transaction, TransactionReceipt, H256, U256, U64,
};
use ethers_providers::{Http, Middleware, Provider};
use tracing::debug;
use url::Url;

use crate::{
    error::{LensError, LensResult},
    gateway::{BlockRef, BlockTag, ChainGateway},
    models::{BlockHeaderView, BlockView, RawTransaction, ReceiptView},
};

/// [`ChainGateway`] over an HTTP JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct EthClient {
    provider: Provider<Http>,
    url: Url,
}

impl EthClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        let url = Url::parse(rpc_url).with_context(|| format!("invalid RPC url {}", rpc_url))?;
        let transport = Http::new_with_client(url.clone(), client);
        let provider = Provider::new(transport);
        Ok(Self { provider, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChainGateway for EthClient {
    async fn chain_id(&self) -> LensResult<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| LensError::rpc("eth_chainId", e))?;
        Ok(u256_to_u64_lossy(id))
    }

    async fn block_number(&self) -> LensResult<u64> {
        let latest = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| LensError::rpc("eth_blockNumber", e))?;
        Ok(latest.as_u64())
    }

    async fn block(
        &self,
        id: BlockRef,
        include_transactions: bool,
    ) -> LensResult<Option<BlockView>> {
        debug!(block = %id, include_transactions, url = %self.url, "fetching block");
        let block_id = to_block_id(id);
        if include_transactions {
            let maybe_block = self
                .provider
                .get_block_with_txs(block_id)
                .await
                .map_err(|e| LensError::rpc("eth_getBlockByNumber", e))?;
            maybe_block.map(normalize_block).transpose()
        } else {
            let maybe_block = self
                .provider
                .get_block(block_id)
                .await
                .map_err(|e| LensError::rpc("eth_getBlockByNumber", e))?;
            maybe_block
                .map(|block| {
                    Ok(BlockView {
                        header: normalize_header(&block)?,
                        transactions: Vec::new(),
                    })
                })
                .transpose()
        }
    }

    async fn transaction(&self, hash: H256) -> LensResult<Option<RawTransaction>> {
        debug!(tx = ?hash, url = %self.url, "fetching transaction");
        let tx = self
            .provider
            .get_transaction(hash)
            .await
            .map_err(|e| LensError::rpc("eth_getTransactionByHash", e))?;
        Ok(tx.map(normalize_tx))
    }

    async fn receipt(&self, hash: H256) -> LensResult<Option<ReceiptView>> {
        debug!(tx = ?hash, url = %self.url, "fetching receipt");
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| LensError::rpc("eth_getTransactionReceipt", e))?;
        Ok(receipt.map(normalize_receipt))
    }
}

fn to_block_id(id: BlockRef) -> BlockId {
    let number = match id {
        BlockRef::Number(n) => BlockNumber::Number(U64::from(n)),
        BlockRef::Tag(BlockTag::Latest) => BlockNumber::Latest,
        BlockRef::Tag(BlockTag::Finalized) => BlockNumber::Finalized,
        BlockRef::Tag(BlockTag::Safe) => BlockNumber::Safe,
        BlockRef::Tag(BlockTag::Pending) => BlockNumber::Pending,
        BlockRef::Tag(BlockTag::Earliest) => BlockNumber::Earliest,
    };
    BlockId::Number(number)
}

fn normalize_block(block: Block<Transaction>) -> LensResult<BlockView> {
    let header = normalize_header(&block)?;
    let transactions = block.transactions.into_iter().map(normalize_tx).collect();
    Ok(BlockView {
        header,
        transactions,
    })
}

/// Pending blocks carry no number or hash and cannot be described as a header.
fn normalize_header<TX>(block: &Block<TX>) -> LensResult<BlockHeaderView> {
    let (Some(number), Some(hash)) = (block.number, block.hash) else {
        return Err(LensError::Pending("block".to_string()));
    };
    Ok(BlockHeaderView {
        number: number.as_u64(),
        hash,
        parent_hash: block.parent_hash,
        state_root: block.state_root,
        receipts_root: block.receipts_root,
        transactions_root: block.transactions_root,
        timestamp: u256_to_u64_lossy(block.timestamp),
        base_fee_per_gas_wei: block.base_fee_per_gas.unwrap_or_default(),
        miner: block.author,
    })
}

fn normalize_tx(tx: Transaction) -> RawTransaction {
    RawTransaction {
        hash: tx.hash,
        from: tx.from,
        to: tx.to,
        value: tx.value,
        gas: tx.gas,
        gas_price: tx.gas_price,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        tx_type: tx.transaction_type.map(|t| t.as_u64()),
        block_number: tx.block_number.map(|n| n.as_u64()),
    }
}

fn normalize_receipt(receipt: TransactionReceipt) -> ReceiptView {
    ReceiptView {
        tx_hash: receipt.transaction_hash,
        from: Some(receipt.from),
        to: receipt.to,
        status: receipt.status.map(|s| s.as_u64().min(1) as u8).unwrap_or(0),
        gas_used: receipt.gas_used.map(u256_to_u64_lossy).unwrap_or(0),
        block_number: receipt.block_number.map(|n| n.as_u64()),
        effective_price_wei: receipt.effective_gas_price,
    }
}

fn u256_to_u64_opt(value: U256) -> Option<u64> {
    let as_u128: u128 = value.try_into().ok()?;
    u64::try_from(as_u128).ok()
}

fn u256_to_u64_lossy(value: U256) -> u64 {
    u256_to_u64_opt(value).unwrap_or(u64::MAX)
}
