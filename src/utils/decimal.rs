//! Decimal arithmetic for spread and slippage calculations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal places kept for spread percentages.
pub const SPREAD_PRECISION: u32 = 5;

/// Decimal places kept for slippage percentages.
pub const SLIPPAGE_PRECISION: u32 = 6;

/// Default fraction of the spread walked when estimating a market buy.
pub const DEFAULT_SLIPPAGE_FACTOR: Decimal = dec!(0.02);

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Convert a ratio into a percentage.
pub fn to_percent(ratio: Decimal) -> Decimal {
    ratio * dec!(100)
}

/// Relative bid/ask spread as a percentage of the ask.
///
/// Returns `None` when the ask is zero. A crossed book (`bid > ask`) yields a
/// negative spread, which is returned unchanged.
pub fn spread_pct(bid: Decimal, ask: Decimal) -> Option<Decimal> {
    (ask - bid).checked_div(ask).map(to_percent)
}

/// Estimated extra cost of a market buy, as a percentage of the ask.
///
/// Models the fill as `ask + factor * (ask - bid)`, i.e. walking `factor` of
/// the way into the spread. This is a heuristic and ignores book depth.
pub fn slippage_pct(bid: Decimal, ask: Decimal, factor: Decimal) -> Option<Decimal> {
    let spread_abs = ask - bid;
    let actual_buy = ask + factor * spread_abs;
    (actual_buy - ask).checked_div(ask).map(to_percent)
}
