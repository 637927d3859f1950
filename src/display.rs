//! Console rendering for snapshot tables and ticker updates.

use anyhow::Result;

use crate::collector::MarketSnapshot;
use crate::exchange::TickerUpdate;
use crate::persistence::{SnapshotSink, CSV_HEADER};

/// Render a bordered table of one cycle's snapshots.
pub fn render_table(snapshots: &[MarketSnapshot]) -> String {
    let rows: Vec<[String; 9]> = snapshots.iter().map(table_row).collect();
    bordered(&CSV_HEADER, &rows)
}

/// Lay out `rows` under `header` with `+---+` borders.
///
/// Widths are counted in chars, matching how `format!` pads.
fn bordered<const N: usize>(header: &[&str; N], rows: &[[String; N]]) -> String {
    let mut widths = (*header).map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let format_line = |cells: &[&str]| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            line.push_str(&format!(" {:<width$} |", cell, width = *width));
        }
        line
    };

    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(border.clone());
    out.push(format_line(header));
    out.push(border.clone());
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(format_line(&cells));
    }
    out.push(border);
    out.join("\n")
}

fn table_row(s: &MarketSnapshot) -> [String; 9] {
    [
        s.market.to_string(),
        s.observed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        s.kucoin_bid.normalize().to_string(),
        s.kucoin_ask.normalize().to_string(),
        s.kucoin_spread_pct.normalize().to_string(),
        s.kucoin_slippage_pct.normalize().to_string(),
        s.binance_bid.normalize().to_string(),
        s.binance_ask.normalize().to_string(),
        s.binance_spread_pct.normalize().to_string(),
    ]
}

/// Text block printed by the stream readers for one update.
pub fn format_ticker(update: &TickerUpdate) -> String {
    let spread = update
        .spread_pct()
        .map(|s| format!("{:.4}%", s))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "[{}] Symbol: {}\nBest Bid: {}\nBest Ask: {}\nSpread: {}\n",
        update.venue.short_code(),
        update.symbol,
        update.bid,
        update.ask,
        spread
    )
}

/// Prints each cycle's table to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl SnapshotSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write_batch(&mut self, snapshots: &[MarketSnapshot]) -> Result<usize> {
        println!("{}", render_table(snapshots));
        Ok(snapshots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Venue;
    use crate::persistence::test_support::snapshot;
    use rust_decimal_macros::dec;

    #[test]
    fn test_table_layout() {
        let table = render_table(&[
            snapshot("BTC/USDT", 1_700_000_000),
            snapshot("DOGE/USDT", 1_700_000_000),
        ]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].starts_with("| Market    | KuCoin Timestamp"));
        assert!(lines[3].starts_with("| BTC/USDT  | 2023-11-14 22:13:20 | 99.5"));
        assert!(lines[4].starts_with("| DOGE/USDT |"));
        // every line has the same width
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn test_non_ascii_cells_stay_aligned() {
        let rows = [
            ["€100".to_string(), "ok".to_string()],
            ["1".to_string(), "größer".to_string()],
        ];
        let table = bordered(&["Price", "Note"], &rows);
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{}", table);
        assert!(table.contains("| €100  | ok     |"));
    }

    #[test]
    fn test_empty_table_has_header() {
        let table = render_table(&[]);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("Binance Spread [%]"));
    }

    #[test]
    fn test_format_ticker() {
        let text = format_ticker(&TickerUpdate {
            venue: Venue::Binance,
            symbol: "BNBUSDT".to_string(),
            bid: dec!(25.35190000),
            ask: dec!(25.36520000),
        });
        assert!(text.starts_with("[BN] Symbol: BNBUSDT\n"));
        assert!(text.contains("Spread: 0.0524%"));
    }

    #[test]
    fn test_format_ticker_zero_ask() {
        let text = format_ticker(&TickerUpdate {
            venue: Venue::Kucoin,
            symbol: "BTC-USDT".to_string(),
            bid: dec!(0),
            ask: dec!(0),
        });
        assert!(text.contains("Spread: n/a"));
    }
}
