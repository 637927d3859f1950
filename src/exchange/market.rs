//! Trading pair identifiers and per-venue symbol conventions.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketParseError {
    #[error("market {0:?} must be written as BASE/QUOTE")]
    Format(String),

    #[error("market {0:?} contains characters other than letters and digits")]
    Characters(String),
}

/// A traded pair such as `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Market {
    base: String,
    quote: String,
}

impl Market {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Binance REST symbol, separator removed (`BTCUSDT`).
    pub fn binance_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Binance book ticker stream name (`btcusdt@bookTicker`).
    pub fn binance_stream(&self) -> String {
        format!("{}@bookTicker", self.binance_symbol().to_lowercase())
    }

    /// KuCoin symbol, slash replaced with a dash (`BTC-USDT`).
    pub fn kucoin_symbol(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    /// Parse a list of `BASE/QUOTE` strings, keeping their order.
    pub fn parse_list<S: AsRef<str>>(items: &[S]) -> Result<Vec<Market>, MarketParseError> {
        items.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl FromStr for Market {
    type Err = MarketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| MarketParseError::Format(s.to_string()))?;
        let (base, quote) = (base.trim(), quote.trim());

        if base.is_empty() || quote.is_empty() {
            return Err(MarketParseError::Format(s.to_string()));
        }
        let valid = |part: &str| part.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(MarketParseError::Characters(s.to_string()));
        }

        Ok(Market::new(base, quote))
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_conventions() {
        let market: Market = "btc/usdt".parse().unwrap();
        assert_eq!(market.to_string(), "BTC/USDT");
        assert_eq!(market.binance_symbol(), "BTCUSDT");
        assert_eq!(market.kucoin_symbol(), "BTC-USDT");
        assert_eq!(market.binance_stream(), "btcusdt@bookTicker");
    }

    #[test]
    fn test_rejects_malformed_markets() {
        assert!(matches!(
            "BTCUSDT".parse::<Market>(),
            Err(MarketParseError::Format(_))
        ));
        assert!(matches!(
            "BTC/".parse::<Market>(),
            Err(MarketParseError::Format(_))
        ));
        assert!(matches!(
            "ADA-USDT/GMX".parse::<Market>(),
            Err(MarketParseError::Characters(_))
        ));
    }

    #[test]
    fn test_parse_list_keeps_order() {
        let markets = Market::parse_list(&["ETH/USDT", "BTC/USDT", "DOGE/USDT"]).unwrap();
        let names: Vec<String> = markets.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["ETH/USDT", "BTC/USDT", "DOGE/USDT"]);
    }
}
