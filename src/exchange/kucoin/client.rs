//! KuCoin spot REST client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::types::{ApiResponse, BulletToken, Level1, SUCCESS_CODE};
use crate::config::KucoinConfig;
use crate::exchange::error::{FetchError, FieldError};
use crate::exchange::market::Market;
use crate::exchange::rest::fetch_json;
use crate::exchange::traits::{Quote, QuoteSource, Venue};

/// KuCoin API client for spot market data.
#[derive(Debug, Clone)]
pub struct KucoinClient {
    http: Client,
    base_url: String,
}

impl KucoinClient {
    /// Create a client from configuration, sharing the given HTTP pool.
    pub fn new(config: &KucoinConfig, http: Client) -> Self {
        Self::with_base_url(http, &config.rest_base_url)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Unwrap the `{code, data}` envelope.
    fn into_data<T>(response: ApiResponse<T>) -> Result<T, FetchError> {
        if response.code != SUCCESS_CODE {
            return Err(FetchError::Api {
                code: response.code,
                message: response.msg.unwrap_or_default(),
            });
        }
        response.data.ok_or(FetchError::Field(FieldError::Missing("data")))
    }

    /// Get the level-1 order book for one symbol.
    #[instrument(skip(self), fields(market = %market))]
    pub async fn get_level1(&self, market: &Market) -> Result<Level1, FetchError> {
        let url = format!(
            "{}/api/v1/market/orderbook/level1?symbol={}",
            self.base_url,
            urlencoding::encode(&market.kucoin_symbol())
        );
        let response: ApiResponse<Level1> = fetch_json(self.http.get(&url)).await?;
        let level1 = Self::into_data(response)?;

        debug!(
            bid = ?level1.best_bid,
            ask = ?level1.best_ask,
            time = ?level1.time,
            "Fetched KuCoin level1"
        );
        Ok(level1)
    }

    /// Request a public websocket token and server list.
    #[instrument(skip(self))]
    pub async fn get_public_ws_token(&self) -> Result<BulletToken, FetchError> {
        let url = format!("{}/api/v1/bullet-public", self.base_url);
        let response: ApiResponse<BulletToken> = fetch_json(self.http.post(&url)).await?;
        let token = Self::into_data(response)?;

        debug!(servers = token.instance_servers.len(), "Obtained KuCoin websocket token");
        Ok(token)
    }
}

#[async_trait]
impl QuoteSource for KucoinClient {
    fn venue(&self) -> Venue {
        Venue::Kucoin
    }

    async fn fetch_quote(&self, market: &Market) -> Result<Quote, FetchError> {
        let level1 = self.get_level1(market).await?;
        Ok(level1.to_quote()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KucoinClient {
        KucoinClient::with_base_url(Client::new(), &server.uri())
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/market/orderbook/level1"))
            .and(query_param("symbol", "BTC-USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"code":"200000","data":{"time":1682000123987,"bestBid":"29999.9","bestAsk":"30000"}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let market: Market = "BTC/USDT".parse().unwrap();
        let quote = client(&server).fetch_quote(&market).await.unwrap();

        assert_eq!(quote.bid, dec!(29999.9));
        assert_eq!(quote.ask, dec!(30000));
        assert_eq!(quote.time.unwrap().timestamp(), 1_682_000_123);
    }

    #[tokio::test]
    async fn test_unknown_symbol_has_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/market/orderbook/level1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"code":"200000","data":null}"#),
            )
            .mount(&server)
            .await;

        let market: Market = "NOPE/USDT".parse().unwrap();
        let err = client(&server).fetch_quote(&market).await.unwrap_err();

        assert!(matches!(err, FetchError::Field(FieldError::Missing("data"))));
    }

    #[tokio::test]
    async fn test_api_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/market/orderbook/level1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"code":"400100","msg":"Invalid symbol"}"#,
            ))
            .mount(&server)
            .await;

        let market: Market = "BTC/USDT".parse().unwrap();
        let err = client(&server).fetch_quote(&market).await.unwrap_err();

        assert!(matches!(err, FetchError::Api { ref code, .. } if code == "400100"));
    }

    #[tokio::test]
    async fn test_public_ws_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/bullet-public"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"code":"200000","data":{"token":"abc","instanceServers":[{"endpoint":"wss://ws-api-spot.kucoin.com/","encrypt":true,"protocol":"websocket","pingInterval":18000,"pingTimeout":10000}]}}"#,
            ))
            .mount(&server)
            .await;

        let token = client(&server).get_public_ws_token().await.unwrap();

        assert_eq!(token.token, "abc");
        assert_eq!(token.instance_servers[0].ping_interval, 18000);
    }
}
