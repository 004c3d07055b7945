use std::io::BufRead;

use ethers_core::types::H256;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{LensError, LensResult},
    gateway::{parse_tx_hash, ChainGateway},
    models::TransactionSummary,
    summary::{SummaryContext, TxSummarizer},
};

const PROGRESS_EVERY: usize = 10;

/// Hashes read from a list, plus the lines that were not valid hashes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HashList {
    pub hashes: Vec<H256>,
    pub rejected: Vec<String>,
}

/// One hash per line; blank lines are ignored and reading stops once `limit`
/// valid hashes were collected.
pub fn read_hashes<R: BufRead>(reader: R, limit: Option<usize>) -> std::io::Result<HashList> {
    let mut list = HashList::default();
    for line in reader.lines() {
        let line = line?;
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        match parse_tx_hash(raw) {
            Ok(hash) => list.hashes.push(hash),
            Err(_) => {
                warn!(line = raw, "skipping invalid hash");
                list.rejected.push(raw.to_string());
            }
        }
        if limit.is_some_and(|limit| list.hashes.len() >= limit) {
            break;
        }
    }
    Ok(list)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Pending,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub tx_hash: H256,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub rows: Vec<TransactionSummary>,
    pub failures: Vec<BatchFailure>,
}

/// Summarize every hash in turn. A failing hash is recorded and the batch
/// moves on.
///
/// The chain id and head are read once up front; failing to read them fails
/// the whole batch. Transactions sharing a block fetch it once.
pub async fn summarize_batch<G: ChainGateway>(
    summarizer: &TxSummarizer,
    gateway: &G,
    hashes: &[H256],
) -> LensResult<BatchReport> {
    let mut context = SummaryContext::load(gateway).await?;
    let mut report = BatchReport::default();
    for (i, hash) in hashes.iter().enumerate() {
        match summarizer.summarize_in(gateway, *hash, &mut context).await {
            Ok(row) => report.rows.push(row),
            Err(err) => {
                warn!(tx = ?hash, error = %err, "failed to summarize transaction");
                report.failures.push(BatchFailure {
                    tx_hash: *hash,
                    kind: failure_kind(&err),
                    reason: err.to_string(),
                });
            }
        }
        if (i + 1) % PROGRESS_EVERY == 0 {
            info!(processed = i + 1, total = hashes.len(), "batch progress");
        }
    }
    debug!(blocks = context.cached_blocks(), "batch finished");
    Ok(report)
}

fn failure_kind(err: &LensError) -> FailureKind {
    match err {
        LensError::Pending(_) => FailureKind::Pending,
        LensError::NotFound(_) | LensError::ReceiptUnavailable(_) => FailureKind::NotFound,
        _ => FailureKind::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_valid_hashes_and_rejects_the_rest() {
        let input = format!(
            "0x{}\n\n  not-a-hash \n0x{}\n",
            "11".repeat(32),
            "22".repeat(32)
        );
        let list = read_hashes(input.as_bytes(), None).unwrap();
        assert_eq!(
            list.hashes,
            vec![H256::repeat_byte(0x11), H256::repeat_byte(0x22)]
        );
        assert_eq!(list.rejected, vec!["not-a-hash".to_string()]);
    }

    #[test]
    fn stops_at_limit() {
        let input = format!(
            "0x{}\n0x{}\n0x{}\n",
            "11".repeat(32),
            "22".repeat(32),
            "33".repeat(32)
        );
        let list = read_hashes(input.as_bytes(), Some(2)).unwrap();
        assert_eq!(list.hashes.len(), 2);
    }

    #[test]
    fn classifies_failures() {
        assert_eq!(
            failure_kind(&LensError::Pending("tx".to_string())),
            FailureKind::Pending
        );
        assert_eq!(
            failure_kind(&LensError::ReceiptUnavailable("tx".to_string())),
            FailureKind::NotFound
        );
        assert_eq!(
            failure_kind(&LensError::Configuration("x".to_string())),
            FailureKind::Error
        );
    }
}
