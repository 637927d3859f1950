//! Exchange integrations.
//!
//! ## KuCoin
//! Level-1 order book over REST (reference venue: timestamp and slippage)
//! and the spot ticker websocket topic.
//!
//! ## Binance
//! Book ticker over REST and raw `@bookTicker` websocket streams.

pub mod binance;
mod error;
mod fields;
pub mod kucoin;
mod market;
mod rest;
mod traits;

pub use binance::{BinanceClient, BinanceWebSocket};
pub use error::{FetchError, FieldError, StreamError};
pub use kucoin::{KucoinClient, KucoinWebSocket};
pub use market::{Market, MarketParseError};
pub use rest::build_http_client;
pub use traits::*;
