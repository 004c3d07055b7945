use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{gateway::RetryPolicy, sampler::DEFAULT_MAX_BLOCK_SPAN};

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub secondary_rpc_url: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub block_span: i64,
    pub step: i64,
    pub max_block_span: u64,
    pub warn_fee_eth: f64,
    pub latency_threshold: Duration,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing RPC_URL env var")]
    MissingRpcUrl,
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup("RPC_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingRpcUrl)?;
        let secondary_rpc_url = lookup("RPC_URL_2").filter(|url| !url.trim().is_empty());

        let timeout_secs: u64 = parse_or(&lookup, "RPC_TIMEOUT_SECS", 25)?;
        let attempts: usize = parse_or(&lookup, "RPC_RETRIES", 2)?;
        let retry_delay_ms: u64 = parse_or(&lookup, "RPC_RETRY_DELAY_MS", 800)?;
        let latency_threshold_ms: u64 = parse_or(&lookup, "LATENCY_THRESHOLD_MS", 200)?;

        Ok(Self {
            rpc_url,
            secondary_rpc_url,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                attempts: attempts.max(1),
                delay: Duration::from_millis(retry_delay_ms),
            },
            block_span: parse_or(&lookup, "FEE_PROFILE_BLOCKS", 300)?,
            step: parse_or(&lookup, "FEE_PROFILE_STEP", 3)?,
            max_block_span: parse_or(&lookup, "FEE_PROFILE_MAX_BLOCKS", DEFAULT_MAX_BLOCK_SPAN)?,
            warn_fee_eth: parse_or(&lookup, "WARN_FEE_ETH", 0.05)?,
            latency_threshold: Duration::from_millis(latency_threshold_ms),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_rpc_url_is_set() {
        let config = Config::from_lookup(lookup_from(&[("RPC_URL", "http://localhost:8545")]))
            .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.secondary_rpc_url, None);
        assert_eq!(config.request_timeout, Duration::from_secs(25));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.block_span, 300);
        assert_eq!(config.step, 3);
        assert_eq!(config.max_block_span, 5_000);
        assert_eq!(config.warn_fee_eth, 0.05);
        assert_eq!(config.latency_threshold, Duration::from_millis(200));
    }

    #[test]
    fn missing_rpc_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingRpcUrl);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("RPC_URL", "http://a"),
            ("RPC_URL_2", "http://b"),
            ("FEE_PROFILE_BLOCKS", "120"),
            ("FEE_PROFILE_STEP", "-1"),
            ("RPC_RETRIES", "0"),
        ]))
        .unwrap();
        assert_eq!(config.secondary_rpc_url.as_deref(), Some("http://b"));
        assert_eq!(config.block_span, 120);
        // validated by the sampler, not here
        assert_eq!(config.step, -1);
        assert_eq!(config.retry.attempts, 1);
    }

    #[test]
    fn unparseable_value_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("RPC_URL", "http://a"),
            ("RPC_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "RPC_TIMEOUT_SECS",
                value: "soon".to_string(),
            }
        );
    }
}
