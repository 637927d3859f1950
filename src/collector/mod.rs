//! Snapshot collection: one concurrent fan-out over every market per cycle.
//!
//! Each market needs one request per venue. All requests of a cycle run
//! concurrently and are joined; results are merged back in input order. A
//! market whose request fails or whose payload is unusable is skipped for
//! the cycle without affecting the others.

mod retry;
mod snapshot;

pub use retry::RetryPolicy;
pub use snapshot::{MarketSnapshot, SnapshotSettings};

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::exchange::{FetchError, Market, Quote, QuoteSource, Venue};

/// A market left out of a cycle and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMarket {
    pub market: Market,
    /// Venue whose request failed, `None` when both quotes arrived but could
    /// not be combined
    pub venue: Option<Venue>,
    pub reason: String,
}

/// Result of one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Successful snapshots, in input market order
    pub snapshots: Vec<MarketSnapshot>,
    pub skipped: Vec<SkippedMarket>,
}

/// Polls a reference venue (KuCoin) and a comparison venue (Binance).
pub struct SnapshotCollector {
    reference: Arc<dyn QuoteSource>,
    comparison: Arc<dyn QuoteSource>,
    settings: SnapshotSettings,
    retry: RetryPolicy,
}

impl SnapshotCollector {
    /// `reference` supplies the timestamp and the slippage estimate.
    pub fn new(
        reference: Arc<dyn QuoteSource>,
        comparison: Arc<dyn QuoteSource>,
        settings: SnapshotSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reference,
            comparison,
            settings,
            retry,
        }
    }

    /// Run one collection pass over `markets`.
    #[instrument(skip_all, fields(markets = markets.len()))]
    pub async fn collect(&self, markets: &[Market]) -> CycleReport {
        let outcomes = join_all(markets.iter().map(|market| self.collect_market(market))).await;

        let mut report = CycleReport::default();
        for (market, outcome) in markets.iter().zip(outcomes) {
            match outcome {
                Ok(snapshot) => report.snapshots.push(snapshot),
                Err((venue, error)) => {
                    warn!(
                        market = %market,
                        venue = %venue.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
                        error = %error,
                        transport = error.is_transport(),
                        "Error reading data for market {}, skipping this cycle",
                        market
                    );
                    report.skipped.push(SkippedMarket {
                        market: market.clone(),
                        venue,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            collected = report.snapshots.len(),
            skipped = report.skipped.len(),
            "Collection pass complete"
        );
        report
    }

    async fn collect_market(
        &self,
        market: &Market,
    ) -> Result<MarketSnapshot, (Option<Venue>, FetchError)> {
        let (reference, comparison) = tokio::join!(
            self.fetch(self.reference.as_ref(), market),
            self.fetch(self.comparison.as_ref(), market),
        );
        let reference = reference?;
        let comparison = comparison?;

        MarketSnapshot::from_quotes(market.clone(), &reference, &comparison, &self.settings)
            .map_err(|e| (None, e))
    }

    async fn fetch(
        &self,
        source: &dyn QuoteSource,
        market: &Market,
    ) -> Result<Quote, (Option<Venue>, FetchError)> {
        let label = format!("{} {}", source.venue(), market);
        self.retry
            .run(&label, || source.fetch_quote(market))
            .await
            .map_err(|e| (Some(source.venue()), e))
    }
}
