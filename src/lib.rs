//! # Spread Collector
//!
//! Periodic bid/ask spread and slippage snapshots for a fixed list of spot
//! markets on KuCoin and Binance, plus live ticker stream readers.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: KuCoin and Binance clients (REST + WebSocket)
//! - `collector`: Concurrent per-cycle fan-out and snapshot construction
//! - `scheduler`: Fixed-interval, non-overlapping collection cycles
//! - `persistence`: CSV and SQLite snapshot sinks
//! - `stream`: Ticker stream readers with optional reconnect
//! - `display`: Console tables and ticker output
//! - `utils`: Decimal arithmetic for spread and slippage

pub mod collector;
pub mod config;
pub mod display;
pub mod exchange;
pub mod persistence;
pub mod scheduler;
pub mod stream;
pub mod utils;

pub use config::Config;
