//! KuCoin websocket ticker feed.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::client::KucoinClient;
use super::types::{ControlFrame, ServerFrame, TickerData, TICKER_TOPIC_PREFIX};
use crate::config::KucoinConfig;
use crate::exchange::error::StreamError;
use crate::exchange::market::Market;
use crate::exchange::traits::{TickerFeed, TickerUpdate, Venue};

const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

/// Where and how to connect for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEndpoint {
    pub url: String,
    pub ping_interval: Duration,
}

/// KuCoin ticker stream for a fixed set of markets.
pub struct KucoinWebSocket {
    client: KucoinClient,
    ws_endpoint: String,
    token: Option<String>,
    ping_interval: Duration,
    markets: Vec<Market>,
}

impl KucoinWebSocket {
    /// `token` is the configured streaming secret. Without one a public token
    /// is requested through `client` for every session.
    pub fn new(config: &KucoinConfig, client: KucoinClient, markets: Vec<Market>) -> Self {
        Self {
            client,
            ws_endpoint: config.ws_endpoint.clone(),
            token: config.ws_token.clone(),
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            markets,
        }
    }

    /// Session URL. The query always follows a `/` path so the upgrade
    /// request line carries an origin-form target.
    fn connect_url(endpoint: &str, token: &str) -> String {
        format!(
            "{}/?token={}&connectId={}",
            endpoint.trim_end_matches('/'),
            urlencoding::encode(token),
            next_id()
        )
    }

    /// Resolve the websocket URL and ping cadence for a new session.
    pub async fn resolve_endpoint(&self) -> Result<SessionEndpoint, StreamError> {
        if let Some(token) = &self.token {
            return Ok(SessionEndpoint {
                url: Self::connect_url(&self.ws_endpoint, token),
                ping_interval: self.ping_interval,
            });
        }

        let bullet = self.client.get_public_ws_token().await?;
        let server = bullet
            .instance_servers
            .first()
            .ok_or_else(|| StreamError::Server("no websocket instance servers offered".into()))?;

        Ok(SessionEndpoint {
            url: Self::connect_url(&server.endpoint, &bullet.token),
            ping_interval: Duration::from_millis(server.ping_interval),
        })
    }

    /// Subscribe frame for every configured market.
    pub fn subscribe_frame(&self) -> ControlFrame {
        let symbols: Vec<String> = self.markets.iter().map(Market::kucoin_symbol).collect();
        ControlFrame::subscribe(next_id(), &symbols)
    }

    /// Decode one text frame.
    ///
    /// Session bookkeeping frames yield `Ok(None)`. Server error frames and
    /// undecodable payloads are errors.
    pub fn parse_message(text: &str) -> Result<Option<TickerUpdate>, StreamError> {
        match serde_json::from_str::<ServerFrame>(text)? {
            ServerFrame::Welcome { .. } => {
                debug!("Welcome received");
                Ok(None)
            }
            ServerFrame::Ack { id } => {
                info!(?id, "Subscription acknowledged");
                Ok(None)
            }
            ServerFrame::Pong { .. } => Ok(None),
            ServerFrame::Error { code, data } => Err(StreamError::Server(format!(
                "{} {}",
                code.map(|c| c.to_string()).unwrap_or_default(),
                data.unwrap_or_default()
            ))),
            ServerFrame::Message {
                topic,
                subject,
                data,
            } => {
                let Some(symbol) = topic.strip_prefix(TICKER_TOPIC_PREFIX) else {
                    debug!(%topic, "Ignoring message on unexpected topic");
                    return Ok(None);
                };
                if subject.as_deref().is_some_and(|s| s != "trade.ticker") {
                    debug!(?subject, "Ignoring non-ticker subject");
                    return Ok(None);
                }
                let ticker: TickerData = serde_json::from_value(data)?;
                Ok(Some(ticker.to_ticker(symbol)?))
            }
            ServerFrame::Other => {
                debug!("Ignoring unknown frame type");
                Ok(None)
            }
        }
    }
}

/// Client-generated id for connect and control frames.
fn next_id() -> String {
    Utc::now().timestamp_micros().to_string()
}

#[async_trait]
impl TickerFeed for KucoinWebSocket {
    fn venue(&self) -> Venue {
        Venue::Kucoin
    }

    async fn run_session(&self, tx: mpsc::Sender<TickerUpdate>) -> Result<(), StreamError> {
        let endpoint = self.resolve_endpoint().await?;
        info!("Connecting to KuCoin WebSocket");

        let (ws_stream, _) = connect_async(endpoint.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let subscribe = serde_json::to_string(&self.subscribe_frame())?;
        write.send(Message::Text(subscribe.into())).await?;
        info!(markets = self.markets.len(), "Subscribed to ticker data");

        let period = endpoint.ping_interval.max(MIN_PING_INTERVAL);
        let mut ping = interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(update) = Self::parse_message(text.as_str())? {
                                if tx.send(update).await.is_err() {
                                    warn!("Ticker receiver dropped");
                                    return Ok(());
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("WebSocket closed by server: {:?}", frame);
                            return Err(StreamError::StreamEnded);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(StreamError::StreamEnded),
                    }
                }
                _ = ping.tick() => {
                    let frame = serde_json::to_string(&ControlFrame::ping(next_id()))?;
                    write.send(Message::Text(frame.into())).await?;
                    debug!("Sent keepalive ping");
                }
            }
        }
    }
}
