use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eth-fee-lens", version, about = "Ethereum fee analytics and provider consistency checks")]
pub struct Cli {
    /// Primary RPC URL, overrides RPC_URL
    #[arg(long, global = true)]
    pub rpc: Option<String>,

    /// Request timeout in seconds, overrides RPC_TIMEOUT_SECS
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fee and gas facts for one transaction
    Tx {
        /// Transaction hash (0x + 64 hex chars)
        hash: String,
        /// Warn when the fee exceeds this many ETH, overrides WARN_FEE_ETH
        #[arg(long)]
        warn_fee_eth: Option<f64>,
    },
    /// Summarize many transactions, one hash per line
    Batch {
        /// File with hashes (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Stop after this many valid hashes
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Percentiles of base fee, effective price and tip over recent blocks
    FeeProfile {
        /// How many recent blocks to cover, overrides FEE_PROFILE_BLOCKS
        #[arg(short, long, allow_negative_numbers = true)]
        blocks: Option<i64>,
        /// Sample every Nth block, overrides FEE_PROFILE_STEP
        #[arg(short, long, allow_negative_numbers = true)]
        step: Option<i64>,
        /// Use this block as the head instead of the latest
        #[arg(long)]
        head: Option<u64>,
    },
    /// Compare a transaction across two providers
    VerifyTx {
        hash: String,
        /// Secondary RPC URL, overrides RPC_URL_2
        #[arg(long)]
        rpc2: Option<String>,
        /// Fail when any field differs
        #[arg(long)]
        strict: bool,
    },
    /// Compare a block header across two providers
    VerifyBlock {
        /// latest|finalized|safe|pending|earliest or a block number
        #[arg(default_value = "latest")]
        block: String,
        #[arg(long)]
        rpc2: Option<String>,
        #[arg(long)]
        strict: bool,
    },
    /// Measure blockNumber latency and head lag of one or more endpoints
    Latency {
        #[arg(long, num_args = 1.., required = true)]
        rpcs: Vec<String>,
        /// Latency threshold in ms, overrides LATENCY_THRESHOLD_MS
        #[arg(long)]
        threshold_ms: Option<u64>,
    },
}
