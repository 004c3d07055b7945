//! Cross-provider consistency checks.
//!
//! Both providers are asked for the same transaction or block; the answers are
//! flattened into field maps (commitment included) and compared key by key.
//! Disagreement is data, reported in the match map. Only strict mode turns it
//! into an error.

use std::collections::BTreeMap;
use std::fmt;

use ethers_core::types::H256;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    commitment::{commit_header, commit_tx, CommitmentDigest},
    error::{LensError, LensResult},
    gateway::{BlockRef, ChainGateway},
    network::NetworkNames,
};

/// Field name to JSON value, ordered so reports are stable.
pub type Bundle = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxBundle {
    pub chain_id: u64,
    pub network: String,
    pub tx: H256,
    pub block_number: u64,
    pub status: u8,
    pub gas_used: u64,
    pub commitment: CommitmentDigest,
}

impl TxBundle {
    pub fn fields(&self) -> Bundle {
        Bundle::from([
            ("chainId".to_string(), json!(self.chain_id)),
            ("network".to_string(), json!(self.network)),
            ("tx".to_string(), json!(self.tx)),
            ("blockNumber".to_string(), json!(self.block_number)),
            ("status".to_string(), json!(self.status)),
            ("gasUsed".to_string(), json!(self.gas_used)),
            ("commitment".to_string(), json!(self.commitment)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderBundle {
    pub chain_id: u64,
    pub network: String,
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub state_root: H256,
    pub receipts_root: H256,
    pub transactions_root: H256,
    pub timestamp: u64,
    pub commitment: CommitmentDigest,
}

impl HeaderBundle {
    pub fn fields(&self) -> Bundle {
        Bundle::from([
            ("chainId".to_string(), json!(self.chain_id)),
            ("network".to_string(), json!(self.network)),
            ("number".to_string(), json!(self.number)),
            ("hash".to_string(), json!(self.hash)),
            ("parentHash".to_string(), json!(self.parent_hash)),
            ("stateRoot".to_string(), json!(self.state_root)),
            ("receiptsRoot".to_string(), json!(self.receipts_root)),
            ("transactionsRoot".to_string(), json!(self.transactions_root)),
            ("timestamp".to_string(), json!(self.timestamp)),
            ("commitment".to_string(), json!(self.commitment)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub primary: Bundle,
    pub secondary: Bundle,
    #[serde(rename = "match")]
    pub match_map: BTreeMap<String, bool>,
    pub overall_match: bool,
}

impl ConsistencyReport {
    pub fn new(primary: Bundle, secondary: Bundle) -> Self {
        let match_map = compare_bundles(&primary, &secondary);
        let overall_match = match_map.values().all(|matched| *matched);
        Self {
            primary,
            secondary,
            match_map,
            overall_match,
        }
    }

    pub fn mismatched_fields(&self) -> Vec<String> {
        self.match_map
            .iter()
            .filter(|(_, matched)| !**matched)
            .map(|(field, _)| field.clone())
            .collect()
    }
}

/// Equality per key over the union of both bundles' keys; a key missing on
/// one side never matches a present one.
pub fn compare_bundles(a: &Bundle, b: &Bundle) -> BTreeMap<String, bool> {
    a.keys()
        .chain(b.keys())
        .map(|key| (key.clone(), a.get(key) == b.get(key)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Primary,
    Secondary,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ConsistencyOutcome {
    Compared(ConsistencyReport),
    /// One side had nothing comparable yet; this is not a mismatch.
    Inconclusive { side: Side, reason: String },
}

impl ConsistencyOutcome {
    pub fn report(&self) -> Option<&ConsistencyReport> {
        match self {
            Self::Compared(report) => Some(report),
            Self::Inconclusive { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsistencyVerifier {
    networks: NetworkNames,
    strict: bool,
}

impl ConsistencyVerifier {
    pub fn new(networks: NetworkNames) -> Self {
        Self {
            networks,
            strict: false,
        }
    }

    /// In strict mode any mismatch is returned as [`LensError::Inconsistent`],
    /// which still carries the report.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub async fn verify_tx<A, B>(
        &self,
        primary: &A,
        secondary: &B,
        tx_hash: H256,
    ) -> LensResult<ConsistencyOutcome>
    where
        A: ChainGateway,
        B: ChainGateway,
    {
        let Some(a) = self.tx_bundle(primary, tx_hash).await? else {
            return Ok(inconclusive(Side::Primary, "transaction pending or not found"));
        };
        let Some(b) = self.tx_bundle(secondary, tx_hash).await? else {
            return Ok(inconclusive(Side::Secondary, "transaction pending or not found"));
        };
        self.conclude(ConsistencyReport::new(a.fields(), b.fields()))
    }

    /// A tag is resolved on the primary only; the secondary is asked for the
    /// number the primary returned.
    pub async fn verify_block<A, B>(
        &self,
        primary: &A,
        secondary: &B,
        id: BlockRef,
    ) -> LensResult<ConsistencyOutcome>
    where
        A: ChainGateway,
        B: ChainGateway,
    {
        let Some(a) = self.header_bundle(primary, id).await? else {
            return Ok(inconclusive(Side::Primary, "block pending or not found"));
        };
        let resolved = BlockRef::Number(a.number);
        if resolved != id {
            info!(requested = %id, resolved = a.number, "resolved block tag on primary");
        }
        let Some(b) = self.header_bundle(secondary, resolved).await? else {
            return Ok(inconclusive(Side::Secondary, "block pending or not found"));
        };
        self.conclude(ConsistencyReport::new(a.fields(), b.fields()))
    }

    pub async fn tx_bundle<G: ChainGateway>(
        &self,
        gateway: &G,
        tx_hash: H256,
    ) -> LensResult<Option<TxBundle>> {
        let receipt = match gateway.receipt(tx_hash).await? {
            Some(receipt) => receipt,
            None => return Ok(None),
        };
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };
        let chain_id = gateway.chain_id().await?;
        let commitment = commit_tx(chain_id, tx_hash, &receipt)?;
        Ok(Some(TxBundle {
            chain_id,
            network: self.networks.label(chain_id),
            tx: tx_hash,
            block_number,
            status: receipt.status,
            gas_used: receipt.gas_used,
            commitment,
        }))
    }

    pub async fn header_bundle<G: ChainGateway>(
        &self,
        gateway: &G,
        id: BlockRef,
    ) -> LensResult<Option<HeaderBundle>> {
        let header = match gateway.block(id, false).await {
            Ok(Some(block)) => block.header,
            Ok(None) | Err(LensError::Pending(_)) | Err(LensError::NotFound(_)) => {
                return Ok(None)
            }
            Err(err) => return Err(err),
        };
        let chain_id = gateway.chain_id().await?;
        Ok(Some(HeaderBundle {
            chain_id,
            network: self.networks.label(chain_id),
            number: header.number,
            hash: header.hash,
            parent_hash: header.parent_hash,
            state_root: header.state_root,
            receipts_root: header.receipts_root,
            transactions_root: header.transactions_root,
            timestamp: header.timestamp,
            commitment: commit_header(chain_id, &header),
        }))
    }

    fn conclude(&self, report: ConsistencyReport) -> LensResult<ConsistencyOutcome> {
        if !report.overall_match {
            warn!(fields = ?report.mismatched_fields(), "providers disagree");
            if self.strict {
                return Err(LensError::inconsistent(report));
            }
        }
        Ok(ConsistencyOutcome::Compared(report))
    }
}

fn inconclusive(side: Side, reason: &str) -> ConsistencyOutcome {
    info!(%side, reason, "consistency check inconclusive");
    ConsistencyOutcome::Inconclusive {
        side,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(pairs: &[(&str, Value)]) -> Bundle {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn identical_bundles_match() {
        let a = bundle(&[("number", json!(1)), ("hash", json!("0x01"))]);
        let report = ConsistencyReport::new(a.clone(), a);
        assert!(report.overall_match);
        assert!(report.mismatched_fields().is_empty());
    }

    #[test]
    fn union_of_keys_is_compared() {
        let a = bundle(&[("number", json!(1)), ("extra", json!(true))]);
        let b = bundle(&[("number", json!(1))]);
        let map = compare_bundles(&a, &b);
        assert_eq!(map.len(), 2);
        assert_eq!(map["number"], true);
        assert_eq!(map["extra"], false);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = bundle(&[("number", json!(1)), ("stateRoot", json!("0xaa"))]);
        let b = bundle(&[("number", json!(1)), ("stateRoot", json!("0xbb")), ("x", json!(0))]);
        assert_eq!(compare_bundles(&a, &b), compare_bundles(&b, &a));
    }

    #[test]
    fn overall_match_is_and_of_fields() {
        let a = bundle(&[("number", json!(1)), ("stateRoot", json!("0xaa"))]);
        let b = bundle(&[("number", json!(1)), ("stateRoot", json!("0xbb"))]);
        let report = ConsistencyReport::new(a, b);
        assert!(!report.overall_match);
        assert_eq!(report.mismatched_fields(), vec!["stateRoot".to_string()]);
    }

    #[test]
    fn strict_mode_escalates_mismatch() {
        let a = bundle(&[("number", json!(1))]);
        let b = bundle(&[("number", json!(2))]);
        let report = ConsistencyReport::new(a, b);

        let lenient = ConsistencyVerifier::default();
        assert!(lenient.conclude(report.clone()).is_ok());

        let strict = ConsistencyVerifier::default().strict(true);
        match strict.conclude(report) {
            Err(LensError::Inconsistent { fields, report }) => {
                assert_eq!(fields, vec!["number"]);
                assert_eq!(report.match_map["number"], false);
            }
            other => panic!("expected inconsistency, got {other:?}"),
        }
    }

    #[test]
    fn report_serializes_match_key() {
        let a = bundle(&[("number", json!(1))]);
        let value = serde_json::to_value(ConsistencyReport::new(a.clone(), a)).unwrap();
        assert_eq!(value["match"]["number"], json!(true));
        assert_eq!(value["overallMatch"], json!(true));
    }
}
