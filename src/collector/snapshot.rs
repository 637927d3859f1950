//! The per-market, per-cycle snapshot record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::exchange::{FetchError, FieldError, Market, Quote};
use crate::utils::decimal::{
    round_to_precision, slippage_pct, spread_pct, DEFAULT_SLIPPAGE_FACTOR, SLIPPAGE_PRECISION,
    SPREAD_PRECISION,
};

/// Calculation constants applied when building snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSettings {
    pub slippage_factor: Decimal,
    pub spread_precision: u32,
    pub slippage_precision: u32,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            slippage_factor: DEFAULT_SLIPPAGE_FACTOR,
            spread_precision: SPREAD_PRECISION,
            slippage_precision: SLIPPAGE_PRECISION,
        }
    }
}

/// Quotes for one market from both venues in one cycle.
///
/// KuCoin is the reference venue: its timestamp stamps the record and only
/// its quote gets a slippage estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub market: Market,
    pub observed_at: DateTime<Utc>,
    pub kucoin_bid: Decimal,
    pub kucoin_ask: Decimal,
    pub kucoin_spread_pct: Decimal,
    pub kucoin_slippage_pct: Decimal,
    pub binance_bid: Decimal,
    pub binance_ask: Decimal,
    pub binance_spread_pct: Decimal,
}

impl MarketSnapshot {
    /// Build a snapshot from the two venues' quotes.
    ///
    /// Fails when the KuCoin quote carries no timestamp or either ask is zero.
    /// Crossed books are recorded as-is with negative spreads.
    pub fn from_quotes(
        market: Market,
        kucoin: &Quote,
        binance: &Quote,
        settings: &SnapshotSettings,
    ) -> Result<Self, FetchError> {
        let observed_at = kucoin.time.ok_or(FieldError::Missing("time"))?;

        let zero_ask = |venue: &str| FetchError::InvalidQuote(format!("{} ask is zero", venue));
        let kucoin_spread = spread_pct(kucoin.bid, kucoin.ask).ok_or_else(|| zero_ask("KuCoin"))?;
        let kucoin_slippage = slippage_pct(kucoin.bid, kucoin.ask, settings.slippage_factor)
            .ok_or_else(|| zero_ask("KuCoin"))?;
        let binance_spread =
            spread_pct(binance.bid, binance.ask).ok_or_else(|| zero_ask("Binance"))?;

        Ok(Self {
            market,
            observed_at,
            kucoin_bid: kucoin.bid,
            kucoin_ask: kucoin.ask,
            kucoin_spread_pct: round_to_precision(kucoin_spread, settings.spread_precision),
            kucoin_slippage_pct: round_to_precision(kucoin_slippage, settings.slippage_precision),
            binance_bid: binance.bid,
            binance_ask: binance.ask,
            binance_spread_pct: round_to_precision(binance_spread, settings.spread_precision),
        })
    }
}
