use std::fmt::Display;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::gateway::ChainGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatencyStatus {
    Ok,
    Slow,
    VerySlow,
    Disconnected,
}

/// `Ok` up to the threshold, `Slow` up to twice the threshold.
pub fn classify_latency(latency: Option<Duration>, threshold: Duration) -> LatencyStatus {
    match latency {
        None => LatencyStatus::Disconnected,
        Some(l) if l <= threshold => LatencyStatus::Ok,
        Some(l) if l <= threshold * 2 => LatencyStatus::Slow,
        Some(_) => LatencyStatus::VerySlow,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyProbe {
    pub endpoint: String,
    pub block: Option<u64>,
    pub latency_ms: Option<u64>,
    pub status: LatencyStatus,
    /// Distance to the highest head seen across all probed endpoints.
    pub blocks_behind: Option<u64>,
}

impl LatencyProbe {
    pub fn disconnected(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            block: None,
            latency_ms: None,
            status: LatencyStatus::Disconnected,
            blocks_behind: None,
        }
    }
}

/// An `http` or `https` URL, or `None` for anything else.
pub fn parse_endpoint(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Probe each endpoint in order and fill in head lag.
///
/// Endpoints that do not parse are skipped. One whose client cannot be built
/// is reported as disconnected and the rest are still probed.
pub async fn probe_endpoints<G, E, F>(
    endpoints: &[String],
    threshold: Duration,
    mut connect: F,
) -> Vec<LatencyProbe>
where
    G: ChainGateway,
    E: Display,
    F: FnMut(&Url) -> Result<G, E>,
{
    let mut probes = Vec::with_capacity(endpoints.len());
    for raw in endpoints {
        let Some(url) = parse_endpoint(raw) else {
            warn!(url = %raw, "skipping invalid RPC url");
            continue;
        };
        match connect(&url) {
            Ok(gateway) => probes.push(probe(raw, &gateway, threshold).await),
            Err(err) => {
                warn!(endpoint = %raw, error = %err, "could not build client");
                probes.push(LatencyProbe::disconnected(raw));
            }
        }
    }
    fill_lag(&mut probes);
    probes
}

/// Time one `blockNumber()` round trip.
pub async fn probe<G: ChainGateway>(
    endpoint: &str,
    gateway: &G,
    threshold: Duration,
) -> LatencyProbe {
    let started = Instant::now();
    let result = gateway.block_number().await;
    let elapsed = started.elapsed();

    match result {
        Ok(block) => {
            let status = classify_latency(Some(elapsed), threshold);
            let latency_ms = elapsed.as_millis() as u64;
            info!(endpoint, block, latency_ms, ?status, "probed endpoint");
            LatencyProbe {
                endpoint: endpoint.to_string(),
                block: Some(block),
                latency_ms: Some(latency_ms),
                status,
                blocks_behind: None,
            }
        }
        Err(err) => {
            warn!(endpoint, error = %err, "endpoint unreachable");
            LatencyProbe::disconnected(endpoint)
        }
    }
}

/// Fill `blocks_behind` for every probe that returned a block.
pub fn fill_lag(probes: &mut [LatencyProbe]) {
    let Some(highest) = probes.iter().filter_map(|p| p.block).max() else {
        return;
    };
    for probe in probes.iter_mut() {
        probe.blocks_behind = probe.block.map(|block| highest - block);
    }
}
