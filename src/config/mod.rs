//! Configuration management for the spread collector.
//!
//! Loads settings from an optional `config.toml`, `.env` and environment
//! variables (`SPREAD_<SECTION>__<KEY>`).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::collector::{RetryPolicy, SnapshotSettings};
use crate::exchange::Market;
use crate::utils::decimal::{DEFAULT_SLIPPAGE_FACTOR, SLIPPAGE_PRECISION, SPREAD_PRECISION};

/// Environment variable holding the KuCoin streaming token.
pub const KUCOIN_WS_TOKEN_ENV: &str = "KUCOIN_WS_TOKEN";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Market list, cadence and calculation constants
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Binance endpoints
    #[serde(default)]
    pub binance: BinanceConfig,
    /// KuCoin endpoints and streaming secret
    #[serde(default)]
    pub kucoin: KucoinConfig,
    /// Output sinks
    #[serde(default)]
    pub output: OutputConfig,
    /// Retry of transient request failures
    #[serde(default)]
    pub retry: RetryConfig,
    /// Live stream reader behaviour
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Markets as `BASE/QUOTE`, polled in this order
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    /// Seconds to wait between the end of one cycle and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Fraction of the spread walked when estimating slippage
    #[serde(default = "default_slippage_factor")]
    pub slippage_factor: Decimal,
    /// Decimal places kept for spread percentages
    #[serde(default = "default_spread_precision")]
    pub spread_precision: u32,
    /// Decimal places kept for slippage percentages
    #[serde(default = "default_slippage_precision")]
    pub slippage_precision: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    #[serde(default = "default_binance_rest_url")]
    pub rest_base_url: String,
    #[serde(default = "default_binance_ws_url")]
    pub ws_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KucoinConfig {
    #[serde(default = "default_kucoin_rest_url")]
    pub rest_base_url: String,
    /// Websocket endpoint used together with a configured token
    #[serde(default = "default_kucoin_ws_endpoint")]
    pub ws_endpoint: String,
    /// Streaming token; when absent a public token is requested per session
    #[serde(default, skip_serializing)]
    pub ws_token: Option<String>,
    /// Keepalive ping cadence used with a configured token
    #[serde(default = "default_kucoin_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

/// Which persistence sinks receive each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkSelection {
    Csv,
    Sqlite,
    Both,
    None,
}

impl SinkSelection {
    pub fn csv(&self) -> bool {
        matches!(self, SinkSelection::Csv | SinkSelection::Both)
    }

    pub fn sqlite(&self) -> bool {
        matches!(self, SinkSelection::Sqlite | SinkSelection::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_sinks")]
    pub sinks: SinkSelection,
    /// Print the table of each cycle to stdout
    #[serde(default = "default_print_table")]
    pub print_table: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Reconnect and resubscribe after a failed session instead of stopping
    #[serde(default)]
    pub reconnect: bool,
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_secs")]
    pub max_reconnect_delay_secs: u64,
}

// Default value functions
fn default_markets() -> Vec<String> {
    [
        "BTC/USDT", "ETH/USDT", "XRP/USDT", "DOGE/USDT", "ADA/USDT", // top 10
        "GMX/USDT", "ARB/USDT", "MKR/USDT", "OP/USDT", "FXS/USDT", // top 100
        "SKL/USDT", "KDA/USDT", "HFT/USDT", "DODO/USDT", "FET/USDT", // top 1000
        "RDNT/USDT", "CAKE/USDT", "WRX/USDT", "ZEC/USDT", "ENS/USDT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_slippage_factor() -> Decimal {
    DEFAULT_SLIPPAGE_FACTOR
}

fn default_spread_precision() -> u32 {
    SPREAD_PRECISION
}

fn default_slippage_precision() -> u32 {
    SLIPPAGE_PRECISION
}

fn default_binance_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_binance_ws_url() -> String {
    "wss://stream.binance.com:9443".to_string()
}

fn default_kucoin_rest_url() -> String {
    "https://api.kucoin.com".to_string()
}

fn default_kucoin_ws_endpoint() -> String {
    "wss://ws-api-spot.kucoin.com".to_string()
}

fn default_kucoin_ping_interval_secs() -> u64 {
    18
}

fn default_csv_path() -> String {
    "market_data.csv".to_string()
}

fn default_sqlite_path() -> String {
    "data/market_data.db".to_string()
}

fn default_sinks() -> SinkSelection {
    SinkSelection::Both
}

fn default_print_table() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

fn default_initial_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("SPREAD")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("collector.markets")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if config.kucoin.ws_token.is_none() {
            config.kucoin.ws_token = std::env::var(KUCOIN_WS_TOKEN_ENV)
                .ok()
                .filter(|token| !token.trim().is_empty());
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.collector.markets.is_empty(),
            "at least one market must be configured"
        );
        self.markets()?;

        anyhow::ensure!(
            self.collector.interval_secs > 0,
            "interval_secs must be greater than 0"
        );

        anyhow::ensure!(
            self.collector.request_timeout_secs > 0,
            "request_timeout_secs must be greater than 0"
        );

        anyhow::ensure!(
            self.collector.slippage_factor >= Decimal::ZERO,
            "slippage_factor must not be negative"
        );

        anyhow::ensure!(
            self.retry.max_attempts >= 1,
            "retry.max_attempts must be at least 1"
        );

        anyhow::ensure!(
            self.retry.initial_backoff_ms <= self.retry.max_backoff_ms,
            "retry.initial_backoff_ms must not exceed retry.max_backoff_ms"
        );

        anyhow::ensure!(
            self.kucoin.ping_interval_secs > 0,
            "kucoin.ping_interval_secs must be greater than 0"
        );

        Ok(())
    }

    /// Parsed market list, in configured order.
    pub fn markets(&self) -> Result<Vec<Market>> {
        Market::parse_list(&self.collector.markets).context("Invalid market in collector.markets")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collector.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.request_timeout_secs)
    }

    pub fn snapshot_settings(&self) -> SnapshotSettings {
        SnapshotSettings {
            slippage_factor: self.collector.slippage_factor,
            spread_precision: self.collector.spread_precision,
            slippage_precision: self.collector.slippage_precision,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            slippage_factor: default_slippage_factor(),
            spread_precision: default_spread_precision(),
            slippage_precision: default_slippage_precision(),
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_binance_rest_url(),
            ws_base_url: default_binance_ws_url(),
        }
    }
}

impl Default for KucoinConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_kucoin_rest_url(),
            ws_endpoint: default_kucoin_ws_endpoint(),
            ws_token: None,
            ping_interval_secs: default_kucoin_ping_interval_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            sqlite_path: default_sqlite_path(),
            sinks: default_sinks(),
            print_table: default_print_table(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: false,
            initial_reconnect_delay_ms: default_initial_reconnect_delay_ms(),
            max_reconnect_delay_secs: default_max_reconnect_delay_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.markets().unwrap().len(), 20);
        assert_eq!(config.collector.slippage_factor, dec!(0.02));
    }

    #[test]
    fn test_default_markets_are_distinct() {
        let markets = Config::default().markets().unwrap();
        let mut symbols: Vec<String> = markets.iter().map(|m| m.kucoin_symbol()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), 20);
        assert!(symbols.contains(&"ADA-USDT".to_string()));
        assert!(symbols.contains(&"GMX-USDT".to_string()));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.collector.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.collector.markets = vec!["BTCUSDT".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.collector.slippage_factor = dec!(-0.01);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{"collector": {"interval_secs": 15, "markets": ["SOL/USDT"]}, "output": {"sinks": "sqlite"}}"#,
        )
        .unwrap();

        assert_eq!(config.interval(), Duration::from_secs(15));
        assert_eq!(config.collector.request_timeout_secs, 10);
        assert!(config.output.sinks.sqlite());
        assert!(!config.output.sinks.csv());
        assert_eq!(config.retry.max_attempts, 3);
    }
}
