use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{LensError, LensResult},
    gateway::{BlockRef, ChainGateway},
    models::BlockView,
};

/// Blocks fetched during one run, keyed by number.
///
/// A cached full block also answers header-only lookups; a cached header
/// does not answer a request for transactions.
#[derive(Debug, Default)]
pub struct BlockCache {
    blocks: HashMap<u64, CachedBlock>,
}

#[derive(Debug)]
struct CachedBlock {
    block: BlockView,
    with_transactions: bool,
}

impl BlockCache {
    pub async fn get_or_fetch<G: ChainGateway>(
        &mut self,
        gateway: &G,
        number: u64,
        include_transactions: bool,
    ) -> LensResult<&BlockView> {
        let cached = self
            .blocks
            .get(&number)
            .is_some_and(|c| c.with_transactions || !include_transactions);

        if cached {
            debug!(number, "block cache hit");
        } else {
            let block = gateway
                .block(BlockRef::Number(number), include_transactions)
                .await?
                .ok_or_else(|| LensError::NotFound(format!("block {}", number)))?;
            self.blocks.insert(
                number,
                CachedBlock {
                    block,
                    with_transactions: include_transactions,
                },
            );
        }

        self.blocks
            .get(&number)
            .map(|c| &c.block)
            .ok_or_else(|| LensError::NotFound(format!("block {}", number)))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
