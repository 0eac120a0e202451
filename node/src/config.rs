//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use fomo_governance::GovernanceParams;
use fomo_ledger::RpcLedgerConfig;
use fomo_registry::DEFAULT_SESSION_TTL_SECS;

use crate::NodeError;

/// Configuration for a FOMODEX node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Address the HTTP API binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Solana JSON-RPC endpoint.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long a submitted transfer may take to confirm.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    /// Wallet bridge that signs transfers for CLI governance commands.
    #[serde(default)]
    pub signer_url: Option<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve `GET /metrics`.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    #[serde(default)]
    pub pollers: PollerConfig,

    #[serde(default)]
    pub market: MarketConfig,

    /// Admin session lifetime.
    #[serde(default = "default_session_ttl_secs")]
    pub admin_session_ttl_secs: u64,

    #[serde(default)]
    pub governance: GovernanceParams,
}

/// Refresh periods of the background caches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_balance_secs")]
    pub balance_secs: u64,
    /// A requested wallet is dropped from the balance cache after this long
    /// without another request.
    #[serde(default = "default_balance_idle_secs")]
    pub balance_idle_secs: u64,
    #[serde(default = "default_tokens_secs")]
    pub tokens_secs: u64,
    #[serde(default = "default_prices_secs")]
    pub prices_secs: u64,
    /// Wallets whose reward-token balance is kept warm from startup.
    #[serde(default)]
    pub watched_wallets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_market_url")]
    pub api_url: String,
    /// Mints always shown, in addition to the listed tokens.
    #[serde(default = "default_market_mints")]
    pub default_mints: Vec<String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./fomo_data")
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_rpc_port() -> u16 {
    7080
}

fn default_ledger_url() -> String {
    RpcLedgerConfig::default().url
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_confirm_poll_interval_ms() -> u64 {
    1_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_balance_secs() -> u64 {
    10
}

fn default_balance_idle_secs() -> u64 {
    3600
}

fn default_tokens_secs() -> u64 {
    60
}

fn default_prices_secs() -> u64 {
    30
}

fn default_market_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_market_mints() -> Vec<String> {
    [
        "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
        "jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL",
        "pumpCmXqMfrsAkQ5r49WcJnRayYRqmXz6ae8H7H9Dfn",
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.governance
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        let p = &self.pollers;
        if p.balance_secs == 0
            || p.balance_idle_secs == 0
            || p.tokens_secs == 0
            || p.prices_secs == 0
        {
            return Err(NodeError::Config("poll intervals must be non-zero".into()));
        }
        if self.confirm_poll_interval_ms == 0 || self.confirm_timeout_secs == 0 {
            return Err(NodeError::Config(
                "confirmation timeout and poll interval must be non-zero".into(),
            ));
        }
        if self.admin_session_ttl_secs == 0 {
            return Err(NodeError::Config("admin_session_ttl_secs must be non-zero".into()));
        }
        Ok(())
    }

    pub fn ledger_config(&self) -> RpcLedgerConfig {
        RpcLedgerConfig {
            url: self.ledger_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.confirm_poll_interval_ms),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.rpc_port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            bind_address: default_bind_address(),
            rpc_port: default_rpc_port(),
            ledger_url: default_ledger_url(),
            request_timeout_secs: default_request_timeout_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            signer_url: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: default_true(),
            pollers: PollerConfig::default(),
            market: MarketConfig::default(),
            admin_session_ttl_secs: default_session_ttl_secs(),
            governance: GovernanceParams::default(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            balance_secs: default_balance_secs(),
            balance_idle_secs: default_balance_idle_secs(),
            tokens_secs: default_tokens_secs(),
            prices_secs: default_prices_secs(),
            watched_wallets: Vec::new(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_url: default_market_url(),
            default_mints: default_market_mints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.rpc_port, config.rpc_port);
        assert_eq!(parsed.governance, config.governance);
        assert_eq!(parsed.pollers, config.pollers);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.rpc_port, 7080);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.pollers.balance_secs, 10);
        assert_eq!(config.pollers.balance_idle_secs, 3600);
        assert_eq!(config.pollers.tokens_secs, 60);
        assert_eq!(config.pollers.prices_secs, 30);
        assert_eq!(config.admin_session_ttl_secs, 24 * 60 * 60);
        assert_eq!(config.governance.max_votes_per_day, 5);
        assert_eq!(config.market.default_mints.len(), 5);
    }

    #[test]
    fn governance_section_overrides() {
        let toml = r#"
            rpc_port = 9999

            [governance]
            burn_amount = 5000
            max_votes_per_day = 3
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.rpc_port, 9999);
        assert_eq!(config.governance.burn_amount, 5_000);
        assert_eq!(config.governance.creator_reward, 10_000);
        assert_eq!(config.governance.total_vote_cost(), 15_000);
        assert_eq!(config.governance.max_votes_per_day, 3);
    }

    #[test]
    fn zero_cap_is_a_config_error() {
        let err = NodeConfig::from_toml_str("[governance]\nmax_votes_per_day = 0").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = NodeConfig::from_toml_str("[pollers]\nprices_secs = 0").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
        let err = NodeConfig::from_toml_str("[pollers]\nbalance_idle_secs = 0").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn ledger_config_carries_timeouts() {
        let mut config = NodeConfig::default();
        config.confirm_timeout_secs = 90;
        config.confirm_poll_interval_ms = 250;
        let ledger = config.ledger_config();
        assert_eq!(ledger.confirm_timeout, Duration::from_secs(90));
        assert_eq!(ledger.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/fomo.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
