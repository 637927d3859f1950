//! Venue-agnostic interfaces for quote sources and ticker streams.
//!
//! The collector and the stream readers only see these traits, so each
//! exchange keeps its own URL scheme, symbol convention and payload shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tokio::sync::mpsc;

use super::error::{FetchError, StreamError};
use super::market::Market;
use crate::utils::decimal::spread_pct;

/// Venue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Binance,
    Kucoin,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Binance => write!(f, "Binance"),
            Venue::Kucoin => write!(f, "KuCoin"),
        }
    }
}

impl Venue {
    /// Short code for display (2-3 chars).
    pub fn short_code(&self) -> &'static str {
        match self {
            Venue::Binance => "BN",
            Venue::Kucoin => "KC",
        }
    }
}

/// Best bid/ask for one market as reported by one venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    /// Exchange-reported time, when the endpoint provides one.
    pub time: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            ask,
            time: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// A decoded book-ticker update from a websocket feed.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    pub venue: Venue,
    /// Symbol in the venue's native format.
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl TickerUpdate {
    /// Relative spread in percent, `None` for a zero ask.
    pub fn spread_pct(&self) -> Option<Decimal> {
        spread_pct(self.bid, self.ask)
    }
}

/// A REST endpoint that returns the current best bid/ask for a market.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Returns the venue identifier.
    fn venue(&self) -> Venue;

    /// Fetch the current top of book for `market`.
    async fn fetch_quote(&self, market: &Market) -> Result<Quote, FetchError>;
}

/// A websocket feed of book-ticker updates.
#[async_trait]
pub trait TickerFeed: Send + Sync {
    /// Returns the venue identifier.
    fn venue(&self) -> Venue;

    /// Run one connection: connect, subscribe, then forward every decoded
    /// update to `tx` until the first error.
    ///
    /// Returns `Ok(())` only when the receiving side has gone away.
    async fn run_session(&self, tx: mpsc::Sender<TickerUpdate>) -> Result<(), StreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_builder() {
        let time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let quote = Quote::new(dec!(99), dec!(100)).with_time(time);
        assert_eq!(quote.time, Some(time));
        assert_eq!(Quote::new(dec!(1), dec!(2)).time, None);
    }

    #[test]
    fn test_venue_display() {
        assert_eq!(Venue::Binance.to_string(), "Binance");
        assert_eq!(Venue::Kucoin.to_string(), "KuCoin");
        assert_eq!(Venue::Kucoin.short_code(), "KC");
    }

    #[test]
    fn test_ticker_update_spread() {
        let update = TickerUpdate {
            venue: Venue::Binance,
            symbol: "BTCUSDT".to_string(),
            bid: dec!(99),
            ask: dec!(100),
        };
        assert_eq!(update.spread_pct(), Some(dec!(1)));
    }
}
