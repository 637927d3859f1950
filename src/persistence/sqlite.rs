//! SQLite snapshot store.
//!
//! One table, `market_snapshots`, keyed on the identity of a quote
//! observation. Re-inserting an identical observation is a no-op, so a
//! restarted collector never duplicates rows.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::{decimal_text, SnapshotSink};
use crate::collector::MarketSnapshot;
use crate::exchange::Market;

/// Aggregates for one market, as shown by the `status` command.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSummary {
    pub market: String,
    pub rows: u64,
    pub latest: Option<DateTime<Utc>>,
    pub avg_kucoin_spread_pct: f64,
    pub avg_binance_spread_pct: f64,
}

/// SQLite-backed snapshot storage.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open the database at `db_path`, creating the schema if needed.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        let store = Self { conn };
        store.init_schema()?;

        info!("Snapshot store initialized at {:?}", db_path);
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS market_snapshots (
                market TEXT NOT NULL,
                observed_at TEXT NOT NULL,
                kucoin_bid TEXT NOT NULL,
                kucoin_ask TEXT NOT NULL,
                kucoin_spread_pct TEXT NOT NULL,
                kucoin_slippage_pct TEXT NOT NULL,
                binance_bid TEXT NOT NULL,
                binance_ask TEXT NOT NULL,
                binance_spread_pct TEXT NOT NULL,
                PRIMARY KEY (market, observed_at, kucoin_bid, kucoin_ask, kucoin_spread_pct)
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_observed_at ON market_snapshots(observed_at);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Insert a batch in one transaction. Returns the number of new rows.
    pub fn insert_batch(&self, snapshots: &[MarketSnapshot]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT OR IGNORE INTO market_snapshots (market, observed_at, kucoin_bid, kucoin_ask,
                                                        kucoin_spread_pct, kucoin_slippage_pct,
                                                        binance_bid, binance_ask, binance_spread_pct)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;

            for s in snapshots {
                inserted += stmt.execute(params![
                    s.market.to_string(),
                    s.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    decimal_text(s.kucoin_bid),
                    decimal_text(s.kucoin_ask),
                    decimal_text(s.kucoin_spread_pct),
                    decimal_text(s.kucoin_slippage_pct),
                    decimal_text(s.binance_bid),
                    decimal_text(s.binance_ask),
                    decimal_text(s.binance_spread_pct),
                ])?;
            }
        }

        tx.commit()?;

        debug!(
            batch = snapshots.len(),
            inserted,
            "Snapshots saved to database"
        );
        Ok(inserted)
    }

    /// Total stored rows.
    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM market_snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Per-market row counts, latest observation and average spreads.
    pub fn market_summaries(&self) -> Result<Vec<MarketSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT market, COUNT(*), MAX(observed_at),
                   AVG(CAST(kucoin_spread_pct AS REAL)), AVG(CAST(binance_spread_pct AS REAL))
            FROM market_snapshots
            GROUP BY market
            ORDER BY market
            "#,
        )?;

        let summaries = stmt
            .query_map([], |row| {
                let latest: Option<String> = row.get(2)?;
                Ok(MarketSummary {
                    market: row.get(0)?,
                    rows: row.get::<_, i64>(1)? as u64,
                    latest: latest.as_deref().and_then(parse_timestamp),
                    avg_kucoin_spread_pct: row.get::<_, Option<f64>>(3)?.unwrap_or_default(),
                    avg_binance_spread_pct: row.get::<_, Option<f64>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }

    /// Most recent snapshots, newest first.
    pub fn recent_snapshots(&self, limit: usize) -> Result<Vec<MarketSnapshot>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT market, observed_at, kucoin_bid, kucoin_ask, kucoin_spread_pct,
                   kucoin_slippage_pct, binance_bid, binance_ask, binance_spread_pct
            FROM market_snapshots
            ORDER BY observed_at DESC, market
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                let mut columns = Vec::with_capacity(9);
                for i in 0..9 {
                    columns.push(row.get::<_, String>(i)?);
                }
                Ok(columns)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter().map(|columns| row_to_snapshot(columns)).collect()
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_snapshot(columns: &[String]) -> Result<MarketSnapshot> {
    let decimal = |i: usize| {
        Decimal::from_str(&columns[i])
            .with_context(|| format!("Invalid decimal in column {}: {}", i, columns[i]))
    };

    Ok(MarketSnapshot {
        market: Market::from_str(&columns[0])?,
        observed_at: parse_timestamp(&columns[1])
            .with_context(|| format!("Invalid timestamp: {}", columns[1]))?,
        kucoin_bid: decimal(2)?,
        kucoin_ask: decimal(3)?,
        kucoin_spread_pct: decimal(4)?,
        kucoin_slippage_pct: decimal(5)?,
        binance_bid: decimal(6)?,
        binance_ask: decimal(7)?,
        binance_spread_pct: decimal(8)?,
    })
}

impl SnapshotSink for SnapshotStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write_batch(&mut self, snapshots: &[MarketSnapshot]) -> Result<usize> {
        self.insert_batch(snapshots)
    }
}
