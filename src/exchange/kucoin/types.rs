//! Type definitions for KuCoin spot API payloads.

use serde::{Deserialize, Serialize};

use crate::exchange::error::FieldError;
use crate::exchange::fields::{millis_to_second, required_decimal};
use crate::exchange::traits::{Quote, TickerUpdate, Venue};

/// Success code used by every KuCoin REST response.
pub const SUCCESS_CODE: &str = "200000";

/// Envelope shared by KuCoin REST responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    /// `null` for unknown symbols.
    pub data: Option<T>,
}

/// Level-1 order book (`GET /api/v1/market/orderbook/level1`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level1 {
    /// Epoch milliseconds.
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub best_bid: Option<String>,
    #[serde(default)]
    pub best_bid_size: Option<String>,
    #[serde(default)]
    pub best_ask: Option<String>,
    #[serde(default)]
    pub best_ask_size: Option<String>,
}

impl Level1 {
    /// Best bid/ask stamped with the exchange time, truncated to seconds.
    pub fn to_quote(&self) -> Result<Quote, FieldError> {
        let bid = required_decimal("bestBid", self.best_bid.as_deref())?;
        let ask = required_decimal("bestAsk", self.best_ask.as_deref())?;
        let millis = self.time.ok_or(FieldError::Missing("time"))?;
        Ok(Quote::new(bid, ask).with_time(millis_to_second("time", millis)?))
    }
}

/// Public websocket token (`POST /api/v1/bullet-public`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletToken {
    pub token: String,
    pub instance_servers: Vec<InstanceServer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceServer {
    pub endpoint: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub protocol: String,
    /// Milliseconds between client pings.
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Client-to-server control frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlFrame {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_channel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<bool>,
}

impl ControlFrame {
    /// Subscribe to the ticker topic for a comma-joined list of symbols.
    pub fn subscribe(id: String, symbols: &[String]) -> Self {
        Self {
            id,
            kind: "subscribe",
            topic: Some(format!("{}{}", TICKER_TOPIC_PREFIX, symbols.join(","))),
            private_channel: Some(false),
            response: Some(true),
        }
    }

    pub fn ping(id: String) -> Self {
        Self {
            id,
            kind: "ping",
            topic: None,
            private_channel: None,
            response: None,
        }
    }
}

/// Topic prefix of the spot ticker channel.
pub const TICKER_TOPIC_PREFIX: &str = "/market/ticker:";

/// Server-to-client frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Welcome {
        #[serde(default)]
        id: Option<String>,
    },
    Ack {
        #[serde(default)]
        id: Option<String>,
    },
    Pong {
        #[serde(default)]
        id: Option<String>,
    },
    Error {
        #[serde(default)]
        code: Option<serde_json::Value>,
        #[serde(default)]
        data: Option<String>,
    },
    Message {
        topic: String,
        #[serde(default)]
        subject: Option<String>,
        data: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// Payload of a `trade.ticker` message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerData {
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub best_bid: Option<String>,
    #[serde(default)]
    pub best_ask: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
}

impl TickerData {
    pub fn to_ticker(&self, symbol: &str) -> Result<TickerUpdate, FieldError> {
        Ok(TickerUpdate {
            venue: Venue::Kucoin,
            symbol: symbol.to_string(),
            bid: required_decimal("bestBid", self.best_bid.as_deref())?,
            ask: required_decimal("bestAsk", self.best_ask.as_deref())?,
        })
    }
}
