//! Append-only CSV sink.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{decimal_text, SnapshotSink};
use crate::collector::MarketSnapshot;

/// Column names, in file order.
pub const CSV_HEADER: [&str; 9] = [
    "Market",
    "KuCoin Timestamp",
    "KuCoin Bid",
    "KuCoin Ask",
    "KuCoin Spread [%]",
    "KuCoin Slippage [%]",
    "Binance Bid",
    "Binance Ask",
    "Binance Spread [%]",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Market")]
    market: String,
    #[serde(rename = "KuCoin Timestamp")]
    kucoin_timestamp: String,
    #[serde(rename = "KuCoin Bid")]
    kucoin_bid: String,
    #[serde(rename = "KuCoin Ask")]
    kucoin_ask: String,
    #[serde(rename = "KuCoin Spread [%]")]
    kucoin_spread: String,
    #[serde(rename = "KuCoin Slippage [%]")]
    kucoin_slippage: String,
    #[serde(rename = "Binance Bid")]
    binance_bid: String,
    #[serde(rename = "Binance Ask")]
    binance_ask: String,
    #[serde(rename = "Binance Spread [%]")]
    binance_spread: String,
}

impl From<&MarketSnapshot> for CsvRow {
    fn from(s: &MarketSnapshot) -> Self {
        Self {
            market: s.market.to_string(),
            kucoin_timestamp: s.observed_at.format(TIMESTAMP_FORMAT).to_string(),
            kucoin_bid: decimal_text(s.kucoin_bid),
            kucoin_ask: decimal_text(s.kucoin_ask),
            kucoin_spread: decimal_text(s.kucoin_spread_pct),
            kucoin_slippage: decimal_text(s.kucoin_slippage_pct),
            binance_bid: decimal_text(s.binance_bid),
            binance_ask: decimal_text(s.binance_ask),
            binance_spread: decimal_text(s.binance_spread_pct),
        }
    }
}

/// Appends snapshot rows to a CSV file.
///
/// The header is written only when the file is new or empty, so restarts
/// keep appending to the same table.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Open (or create) the file at `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {:?}", path))?;
        let needs_headers = file.metadata()?.len() == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(needs_headers)
            .from_writer(file);

        info!(path = ?path, new_file = needs_headers, "CSV sink ready");
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write_batch(&mut self, snapshots: &[MarketSnapshot]) -> Result<usize> {
        for snapshot in snapshots {
            self.writer
                .serialize(CsvRow::from(snapshot))
                .with_context(|| format!("Failed to write CSV row for {}", snapshot.market))?;
        }
        self.writer.flush()?;

        debug!(rows = snapshots.len(), path = ?self.path, "Appended CSV rows");
        Ok(snapshots.len())
    }
}
