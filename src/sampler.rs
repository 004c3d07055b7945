use std::time::Instant;

use tracing::{info, warn};

use crate::{
    block_cache::BlockCache,
    error::{LensError, LensResult},
    fees::{classify, wei_to_gwei},
    gateway::ChainGateway,
    models::FeeProfile,
    network::NetworkNames,
    percentile::{summarize, summarize_tips},
};

/// Spans above this are clamped to it unless the sampler is told otherwise.
pub const DEFAULT_MAX_BLOCK_SPAN: u64 = 5_000;

/// Spans above this are rejected outright rather than clamped.
pub const HARD_BLOCK_SPAN_LIMIT: u64 = 100_000;

const PROGRESS_EVERY: u64 = 20;

/// Parameters of one sampling run, as received from the caller.
///
/// Signed so that non-positive values coming from user input can be
/// rejected instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingRequest {
    pub block_span: i64,
    pub stride: i64,
    /// Sample backwards from this block instead of the current head.
    pub head: Option<u64>,
}

/// A validated [`SamplingRequest`]: span clamped to the ceiling, stride
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub span: u64,
    pub stride: u64,
    pub head: Option<u64>,
}

/// Walks recent blocks and profiles base fee, effective price and tip.
#[derive(Debug, Clone)]
pub struct BlockFeeSampler {
    networks: NetworkNames,
    max_span: u64,
}

impl Default for BlockFeeSampler {
    fn default() -> Self {
        Self::new(NetworkNames::default())
    }
}

impl BlockFeeSampler {
    pub fn new(networks: NetworkNames) -> Self {
        Self {
            networks,
            max_span: DEFAULT_MAX_BLOCK_SPAN,
        }
    }

    pub fn with_max_span(mut self, max_span: u64) -> Self {
        self.max_span = max_span.clamp(1, HARD_BLOCK_SPAN_LIMIT);
        self
    }

    /// Check a request without touching the network. A span over the
    /// ceiling is clamped with a warning.
    pub fn validate(&self, request: &SamplingRequest) -> LensResult<SamplingPlan> {
        if request.stride <= 0 {
            return Err(LensError::Configuration(format!(
                "stride must be > 0, got {}",
                request.stride
            )));
        }
        if request.block_span <= 0 {
            return Err(LensError::Configuration(format!(
                "block span must be > 0, got {}",
                request.block_span
            )));
        }
        let span = request.block_span as u64;
        if span > HARD_BLOCK_SPAN_LIMIT {
            return Err(LensError::Configuration(format!(
                "block span {} exceeds the limit of {}",
                span, HARD_BLOCK_SPAN_LIMIT
            )));
        }
        let span = if span > self.max_span {
            warn!(
                requested = span,
                max = self.max_span,
                "limiting block span to avoid excessive RPC load"
            );
            self.max_span
        } else {
            span
        };
        Ok(SamplingPlan {
            span,
            stride: request.stride as u64,
            head: request.head,
        })
    }

    /// [`validate`](Self::validate) then [`sample_plan`](Self::sample_plan).
    pub async fn sample<G: ChainGateway>(
        &self,
        gateway: &G,
        request: SamplingRequest,
    ) -> LensResult<FeeProfile> {
        let plan = self.validate(&request)?;
        self.sample_plan(gateway, plan).await
    }

    pub async fn sample_plan<G: ChainGateway>(
        &self,
        gateway: &G,
        plan: SamplingPlan,
    ) -> LensResult<FeeProfile> {
        let SamplingPlan { span, stride, .. } = plan;
        let started = Instant::now();

        let chain_id = gateway.chain_id().await?;
        let head = match plan.head {
            Some(head) => head,
            None => gateway.block_number().await?,
        };
        let start = head.saturating_sub(span - 1);
        info!(head, start, stride, "sampling block fees");

        let mut cache = BlockCache::default();
        let mut base_fees = Vec::new();
        let mut effective_prices = Vec::new();
        let mut tips = Vec::new();
        let mut sampled = 0u64;

        let mut number = head;
        loop {
            let block = cache.get_or_fetch(gateway, number, true).await?;
            let base_fee = block.header.base_fee_per_gas_wei;
            base_fees.push(wei_to_gwei(base_fee));
            for tx in &block.transactions {
                let fees = classify(tx, Some(base_fee));
                effective_prices.push(wei_to_gwei(fees.effective_wei));
                tips.push(wei_to_gwei(fees.tip_wei));
            }

            sampled += 1;
            if sampled % PROGRESS_EVERY == 0 {
                info!(sampled, latest = number, "sampling progress");
            }

            match number.checked_sub(stride) {
                Some(next) if next >= start => number = next,
                _ => break,
            }
        }
        debug_assert_eq!(sampled, sampled_block_count(head, start, stride));

        let avg_block_time_sec = if sampled >= 2 && head > start {
            let head_ts = cache.get_or_fetch(gateway, head, false).await?.header.timestamp;
            let start_ts = cache.get_or_fetch(gateway, start, false).await?.header.timestamp;
            head_ts.saturating_sub(start_ts) as f64 / (head - start) as f64
        } else {
            0.0
        };

        Ok(FeeProfile {
            chain_id,
            network: self.networks.label(chain_id),
            head,
            sampled_blocks: sampled,
            block_span: span,
            step: stride,
            avg_block_time_sec,
            timing_sec: started.elapsed().as_secs_f64(),
            base_fee_gwei: summarize(&base_fees),
            effective_price_gwei: summarize(&effective_prices),
            tip_gwei_approx: summarize_tips(&tips),
        })
    }
}

/// Number of blocks a run over `[start, head]` visits.
pub fn sampled_block_count(head: u64, start: u64, stride: u64) -> u64 {
    if stride == 0 || head < start {
        return 0;
    }
    (head - start) / stride + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(block_span: i64, stride: i64) -> SamplingRequest {
        SamplingRequest {
            block_span,
            stride,
            head: Some(100),
        }
    }

    #[test]
    fn rejects_non_positive_stride_and_span() {
        let sampler = BlockFeeSampler::default();
        for (span, stride) in [(10, 0), (10, -3), (0, 3), (-5, 3)] {
            assert!(matches!(
                sampler.validate(&request(span, stride)),
                Err(LensError::Configuration(_))
            ));
        }
    }

    #[test]
    fn clamps_span_to_ceiling() {
        let sampler = BlockFeeSampler::default();
        let plan = sampler.validate(&request(9_000, 3)).unwrap();
        assert_eq!((plan.span, plan.stride, plan.head), (5_000, 3, Some(100)));

        let tight = BlockFeeSampler::default().with_max_span(50);
        assert_eq!(tight.validate(&request(60, 1)).unwrap().span, 50);
        assert_eq!(tight.validate(&request(40, 1)).unwrap().span, 40);
    }

    #[test]
    fn rejects_span_past_hard_limit() {
        let sampler = BlockFeeSampler::default();
        assert!(matches!(
            sampler.validate(&request(100_001, 1)),
            Err(LensError::Configuration(_))
        ));
    }

    #[test]
    fn sampled_count_formula() {
        assert_eq!(sampled_block_count(100, 91, 3), 4);
        assert_eq!(sampled_block_count(100, 100, 3), 1);
        assert_eq!(sampled_block_count(100, 91, 1), 10);
        assert_eq!(sampled_block_count(100, 91, 20), 1);
    }
}
