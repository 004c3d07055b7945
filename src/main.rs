mod cli;

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use eth_fee_lens::{
    batch::{read_hashes, summarize_batch},
    config::Config,
    consistency::{ConsistencyOutcome, ConsistencyVerifier},
    eth::EthClient,
    gateway::parse_tx_hash,
    latency::probe_endpoints,
    network::NetworkNames,
    sampler::{BlockFeeSampler, SamplingRequest},
    summary::TxSummarizer,
    BlockRef, LensResult, RetryingGateway,
};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let rpc_override = cli.rpc.clone().or_else(|| match &cli.command {
        Commands::Latency { rpcs, .. } => rpcs.first().cloned(),
        _ => None,
    });
    let mut config = match rpc_override {
        None => Config::from_env(),
        Some(url) => Config::from_lookup(|key| match key {
            "RPC_URL" => Some(url.clone()),
            _ => env::var(key).ok(),
        }),
    }
    .context("failed to load configuration")?;
    if let Some(secs) = cli.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }

    let networks = NetworkNames::default();

    match cli.command {
        Commands::Tx { hash, warn_fee_eth } => {
            let tx_hash = parse_tx_hash(&hash)?;
            let gateway = connect(&config.rpc_url, &config)?;
            let summary = TxSummarizer::new(networks)
                .summarize(&gateway, tx_hash)
                .await?;
            let threshold = warn_fee_eth.unwrap_or(config.warn_fee_eth);
            if summary.exceeds_fee_threshold(threshold) {
                tracing::warn!(
                    fee_eth = summary.total_fee_eth,
                    threshold_eth = threshold,
                    "high fee"
                );
            }
            print_json(&summary, cli.compact)?;
            log_rpc_usage(&gateway);
        }
        Commands::Batch { file, limit } => {
            let list = match &file {
                Some(path) => {
                    let f = File::open(path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    read_hashes(BufReader::new(f), limit)?
                }
                None => read_hashes(io::stdin().lock(), limit)?,
            };
            if list.hashes.is_empty() {
                bail!("no valid transaction hashes provided");
            }
            tracing::info!(count = list.hashes.len(), "processing transaction hashes");

            let gateway = connect(&config.rpc_url, &config)?;
            let summarizer = TxSummarizer::new(networks);
            let report = summarize_batch(&summarizer, &gateway, &list.hashes).await?;
            print_json(&report, cli.compact)?;
            log_rpc_usage(&gateway);
        }
        Commands::FeeProfile { blocks, step, head } => {
            let request = SamplingRequest {
                block_span: blocks.unwrap_or(config.block_span),
                stride: step.unwrap_or(config.step),
                head,
            };
            let sampler = BlockFeeSampler::new(networks).with_max_span(config.max_block_span);
            // reject bad parameters before opening a connection
            let plan = sampler.validate(&request)?;

            let gateway = connect(&config.rpc_url, &config)?;
            let profile = sampler.sample_plan(&gateway, plan).await?;
            if profile.sampled_blocks == 0 {
                tracing::warn!("no blocks were sampled, check --blocks/--step and head range");
            }
            print_json(&profile, cli.compact)?;
            log_rpc_usage(&gateway);
        }
        Commands::VerifyTx { hash, rpc2, strict } => {
            let tx_hash = parse_tx_hash(&hash)?;
            let (primary, secondary) = connect_pair(rpc2, &config)?;
            let result = ConsistencyVerifier::new(networks)
                .strict(strict)
                .verify_tx(&primary, &secondary, tx_hash)
                .await;
            finish_verification(result, cli.compact)?;
        }
        Commands::VerifyBlock { block, rpc2, strict } => {
            let id: BlockRef = block.parse()?;
            let (primary, secondary) = connect_pair(rpc2, &config)?;
            let result = ConsistencyVerifier::new(networks)
                .strict(strict)
                .verify_block(&primary, &secondary, id)
                .await;
            finish_verification(result, cli.compact)?;
        }
        Commands::Latency { rpcs, threshold_ms } => {
            let threshold = threshold_ms
                .map(Duration::from_millis)
                .unwrap_or(config.latency_threshold);
            let timeout = config.request_timeout;
            let probes = probe_endpoints(&rpcs, threshold, |url| {
                EthClient::new(url.as_str(), timeout)
            })
            .await;
            print_json(&probes, cli.compact)?;
        }
    }

    Ok(())
}

fn connect(url: &str, config: &Config) -> anyhow::Result<RetryingGateway<EthClient>> {
    let client = EthClient::new(url, config.request_timeout)?;
    tracing::debug!(url = %client.url(), "connected gateway");
    Ok(RetryingGateway::new(client, config.retry))
}

fn connect_pair(
    rpc2: Option<String>,
    config: &Config,
) -> anyhow::Result<(RetryingGateway<EthClient>, RetryingGateway<EthClient>)> {
    let Some(secondary_url) = rpc2.or_else(|| config.secondary_rpc_url.clone()) else {
        bail!("a secondary RPC url is required (--rpc2 or RPC_URL_2)");
    };
    Ok((
        connect(&config.rpc_url, config)?,
        connect(&secondary_url, config)?,
    ))
}

/// Prints the comparison even when strict mode turned it into an error, then
/// returns that error so the process exits non-zero.
fn finish_verification(
    result: LensResult<ConsistencyOutcome>,
    compact: bool,
) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => report_outcome(&outcome, compact),
        Err(err) => {
            if let Some(report) = err.inconsistency_report() {
                print_json(&ConsistencyOutcome::Compared(report.clone()), compact)?;
            }
            Err(err.into())
        }
    }
}

fn report_outcome(outcome: &ConsistencyOutcome, compact: bool) -> anyhow::Result<()> {
    match outcome {
        ConsistencyOutcome::Compared(report) if report.overall_match => {
            tracing::info!("all fields match across providers");
        }
        ConsistencyOutcome::Compared(report) => {
            tracing::warn!(fields = ?report.mismatched_fields(), "inconsistencies detected");
        }
        ConsistencyOutcome::Inconclusive { side, reason } => {
            tracing::info!(%side, reason = %reason, "pending or not found on at least one provider");
        }
    }
    print_json(outcome, compact)
}

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> anyhow::Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to serialize result")?;
    println!("{}", rendered);
    Ok(())
}

fn log_rpc_usage<G>(gateway: &RetryingGateway<G>) {
    let stats = gateway.stats().snapshot();
    tracing::info!(
        calls = stats.calls,
        retries = stats.retries,
        failures = stats.failures,
        "rpc usage"
    );
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();
}
