use ethers_providers::ProviderError;

use crate::consistency::ConsistencyReport;

#[derive(thiserror::Error, Debug)]
pub enum LensError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} is pending (not yet included in a block)")]
    Pending(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("receipt unavailable for transaction {0}")]
    ReceiptUnavailable(String),
    #[error("rpc call {call} failed: {source}")]
    Rpc {
        call: &'static str,
        #[source]
        source: ProviderError,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Strict-mode mismatch; the full comparison travels with the error.
    #[error("providers disagree on: {}", fields.join(", "))]
    Inconsistent {
        fields: Vec<String>,
        report: Box<ConsistencyReport>,
    },
}

impl LensError {
    pub fn rpc(call: &'static str, source: ProviderError) -> Self {
        Self::Rpc { call, source }
    }

    pub fn inconsistent(report: ConsistencyReport) -> Self {
        Self::Inconsistent {
            fields: report.mismatched_fields(),
            report: Box::new(report),
        }
    }

    /// The comparison behind a strict-mode mismatch.
    pub fn inconsistency_report(&self) -> Option<&ConsistencyReport> {
        match self {
            Self::Inconsistent { report, .. } => Some(&**report),
            _ => None,
        }
    }

    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }
}

pub type LensResult<T> = Result<T, LensError>;
