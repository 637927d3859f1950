//! Binance spot integration.
//!
//! - REST `ticker/bookTicker` for the periodic collector
//! - Raw `<symbol>@bookTicker` websocket streams for the live reader

mod client;
mod types;
mod websocket;

pub use client::BinanceClient;
pub use types::*;
pub use websocket::BinanceWebSocket;
