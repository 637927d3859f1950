//! Binance websocket book-ticker feed.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::types::BookTickerUpdate;
use crate::config::BinanceConfig;
use crate::exchange::error::StreamError;
use crate::exchange::market::Market;
use crate::exchange::traits::{TickerFeed, TickerUpdate, Venue};

/// Binance book-ticker stream for a fixed set of markets.
///
/// Streams are selected through the URL path, so no subscribe frame is sent.
pub struct BinanceWebSocket {
    base_url: String,
    markets: Vec<Market>,
}

impl BinanceWebSocket {
    pub fn new(config: &BinanceConfig, markets: Vec<Market>) -> Self {
        Self {
            base_url: config.ws_base_url.trim_end_matches('/').to_string(),
            markets,
        }
    }

    /// Raw-stream URL: `<base>/ws/btcusdt@bookTicker/ethusdt@bookTicker`.
    pub fn stream_url(&self) -> String {
        let streams: Vec<String> = self.markets.iter().map(Market::binance_stream).collect();
        format!("{}/ws/{}", self.base_url, streams.join("/"))
    }

    /// Decode one text frame.
    ///
    /// Control responses (`{"result":null,"id":1}`) yield `Ok(None)`. Anything
    /// that is neither a control response nor a valid book ticker is an error.
    pub fn parse_message(text: &str) -> Result<Option<TickerUpdate>, StreamError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.get("result").is_some() && value.get("id").is_some() {
            debug!("Ignoring control response");
            return Ok(None);
        }

        let update: BookTickerUpdate = serde_json::from_value(value)?;
        Ok(Some(update.to_ticker()?))
    }
}

#[async_trait]
impl TickerFeed for BinanceWebSocket {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn run_session(&self, tx: mpsc::Sender<TickerUpdate>) -> Result<(), StreamError> {
        let url = self.stream_url();
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (_write, mut read) = ws_stream.split();
        info!(markets = self.markets.len(), "Connected to Binance book ticker stream");

        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => {
                    if let Some(update) = Self::parse_message(text.as_str())? {
                        if tx.send(update).await.is_err() {
                            warn!("Ticker receiver dropped");
                            return Ok(());
                        }
                    }
                }
                Message::Ping(_) => {
                    debug!("Received ping, pong is handled by tungstenite");
                }
                Message::Close(frame) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    return Err(StreamError::StreamEnded);
                }
                _ => {}
            }
        }

        Err(StreamError::StreamEnded)
    }
}
