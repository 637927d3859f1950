//! End-to-end collection against mocked KuCoin and Binance REST APIs.

use rust_decimal_macros::dec;
use spread_collector::collector::{RetryPolicy, SnapshotCollector, SnapshotSettings};
use spread_collector::exchange::{build_http_client, BinanceClient, KucoinClient, Market, Venue};
use spread_collector::persistence::{SnapshotSink, SnapshotStore};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Log output captured by a test subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn kucoin_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/market/orderbook/level1"))
        .and(query_param("symbol", "BTC-USDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":"200000","data":{"time":1682000123987,"sequence":"1","price":"100","size":"1","bestBid":"99","bestBidSize":"2","bestAsk":"100","bestAskSize":"3"}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/market/orderbook/level1"))
        .and(query_param("symbol", "ETH-USDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":"200000","data":{"time":1682000123987,"bestBid":"1850.10"}}"#,
        ))
        .mount(&server)
        .await;
    server
}

async fn binance_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/bookTicker"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"symbol":"BTCUSDT","bidPrice":"29999.99000000","bidQty":"1.5","askPrice":"30000.00000000","askQty":"2"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/bookTicker"))
        .and(query_param("symbol", "ETHUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"symbol":"ETHUSDT","bidPrice":"1850.00","bidQty":"1","askPrice":"1850.20","askQty":"1"}"#,
        ))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_malformed_market_is_skipped_and_rest_is_stored() {
    let kucoin = kucoin_server().await;
    let binance = binance_server().await;
    let http = build_http_client(Duration::from_secs(5)).unwrap();

    let collector = SnapshotCollector::new(
        Arc::new(KucoinClient::with_base_url(http.clone(), &kucoin.uri())),
        Arc::new(BinanceClient::with_base_url(http, &binance.uri())),
        SnapshotSettings::default(),
        RetryPolicy::default(),
    );
    let markets = Market::parse_list(&["BTC/USDT", "ETH/USDT"]).unwrap();

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let report = {
        let _guard = tracing::subscriber::set_default(subscriber);
        collector.collect(&markets).await
    };

    let warnings = logs.contents();
    assert!(
        warnings.contains("Error reading data for market ETH/USDT, skipping this cycle"),
        "logs: {}",
        warnings
    );
    assert!(!warnings.contains("market BTC/USDT"));

    assert_eq!(report.snapshots.len(), 1);
    let btc = &report.snapshots[0];
    assert_eq!(btc.market.to_string(), "BTC/USDT");
    assert_eq!(btc.observed_at.timestamp(), 1_682_000_123);
    assert_eq!(btc.kucoin_spread_pct, dec!(1));
    assert_eq!(btc.kucoin_slippage_pct, dec!(0.02));
    assert_eq!(btc.binance_spread_pct, dec!(0.00003));

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].market.to_string(), "ETH/USDT");
    assert_eq!(report.skipped[0].venue, Some(Venue::Kucoin));

    let mut store = SnapshotStore::new(":memory:").unwrap();
    assert_eq!(store.write_batch(&report.snapshots).unwrap(), 1);
    assert_eq!(store.write_batch(&report.snapshots).unwrap(), 0);
    assert_eq!(store.row_count().unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_venue_skips_every_market() {
    let kucoin = kucoin_server().await;
    let http = build_http_client(Duration::from_secs(1)).unwrap();

    let collector = SnapshotCollector::new(
        Arc::new(KucoinClient::with_base_url(http.clone(), &kucoin.uri())),
        Arc::new(BinanceClient::with_base_url(http, "http://127.0.0.1:9")),
        SnapshotSettings::default(),
        RetryPolicy::none(),
    );
    let markets = Market::parse_list(&["BTC/USDT"]).unwrap();

    let report = collector.collect(&markets).await;

    assert!(report.snapshots.is_empty());
    assert_eq!(report.skipped[0].venue, Some(Venue::Binance));
}
