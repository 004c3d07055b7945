//! Fee analytics and cross-provider consistency checks for Ethereum-style
//! chains, built on a [`gateway::ChainGateway`] abstraction over JSON-RPC.

pub mod batch;
pub mod block_cache;
pub mod commitment;
pub mod config;
pub mod consistency;
pub mod error;
pub mod eth;
pub mod fees;
pub mod gateway;
pub mod latency;
pub mod models;
pub mod network;
pub mod percentile;
pub mod rpc_stats;
pub mod sampler;
pub mod summary;

pub use error::{LensError, LensResult};
pub use gateway::{BlockRef, ChainGateway, RetryPolicy, RetryingGateway};
