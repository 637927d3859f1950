//! Binance spot REST client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::types::BookTicker;
use crate::config::BinanceConfig;
use crate::exchange::error::FetchError;
use crate::exchange::market::Market;
use crate::exchange::rest::fetch_json;
use crate::exchange::traits::{Quote, QuoteSource, Venue};

/// Binance API client for spot market data.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a client from configuration, sharing the given HTTP pool.
    pub fn new(config: &BinanceConfig, http: Client) -> Self {
        Self::with_base_url(http, &config.rest_base_url)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get best bid/ask for one symbol.
    #[instrument(skip(self), fields(market = %market))]
    pub async fn get_book_ticker(&self, market: &Market) -> Result<BookTicker, FetchError> {
        let url = format!(
            "{}/api/v3/ticker/bookTicker?symbol={}",
            self.base_url,
            urlencoding::encode(&market.binance_symbol())
        );
        let ticker: BookTicker = fetch_json(self.http.get(&url)).await?;

        debug!(
            bid = ?ticker.bid_price,
            ask = ?ticker.ask_price,
            "Fetched Binance book ticker"
        );
        Ok(ticker)
    }
}

#[async_trait]
impl QuoteSource for BinanceClient {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn fetch_quote(&self, market: &Market) -> Result<Quote, FetchError> {
        let ticker = self.get_book_ticker(market).await?;
        Ok(ticker.to_quote()?)
    }
}
