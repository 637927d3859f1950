//! Type definitions for Binance spot API payloads.

use serde::Deserialize;

use crate::exchange::error::FieldError;
use crate::exchange::fields::required_decimal;
use crate::exchange::traits::{Quote, TickerUpdate, Venue};

/// Response of `GET /api/v3/ticker/bookTicker?symbol=...`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub bid_price: Option<String>,
    #[serde(default)]
    pub bid_qty: Option<String>,
    #[serde(default)]
    pub ask_price: Option<String>,
    #[serde(default)]
    pub ask_qty: Option<String>,
}

impl BookTicker {
    /// Best bid/ask. The endpoint carries no timestamp.
    pub fn to_quote(&self) -> Result<Quote, FieldError> {
        let bid = required_decimal("bidPrice", self.bid_price.as_deref())?;
        let ask = required_decimal("askPrice", self.ask_price.as_deref())?;
        Ok(Quote::new(bid, ask))
    }
}

/// Raw `<symbol>@bookTicker` stream payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BookTickerUpdate {
    #[serde(rename = "u", default)]
    pub update_id: Option<u64>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid_price: String,
    #[serde(rename = "B", default)]
    pub bid_qty: Option<String>,
    #[serde(rename = "a")]
    pub ask_price: String,
    #[serde(rename = "A", default)]
    pub ask_qty: Option<String>,
}

impl BookTickerUpdate {
    pub fn to_ticker(&self) -> Result<TickerUpdate, FieldError> {
        Ok(TickerUpdate {
            venue: Venue::Binance,
            symbol: self.symbol.clone(),
            bid: required_decimal("b", Some(&self.bid_price))?,
            ask: required_decimal("a", Some(&self.ask_price))?,
        })
    }
}
