//! Output sinks for collected snapshots.
//!
//! Every cycle's batch is handed to each configured sink in turn:
//! - CSV file, append only, header written once
//! - SQLite store keyed on the snapshot identity, duplicates ignored
//! - Console table (see [`crate::display::ConsoleSink`])
//!
//! Sinks own their handles for the scheduler's whole lifetime.

mod csv;
mod sqlite;

pub use self::csv::{CsvSink, CSV_HEADER};
pub use self::sqlite::{MarketSummary, SnapshotStore};

use anyhow::Result;
use tracing::info;

use crate::collector::MarketSnapshot;
use crate::config::OutputConfig;
use crate::display::ConsoleSink;

/// Destination for a cycle's snapshots.
///
/// Sinks never filter or alter records.
pub trait SnapshotSink: Send {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Write one batch, returning the number of records actually stored.
    fn write_batch(&mut self, snapshots: &[MarketSnapshot]) -> Result<usize>;
}

/// Open every sink selected in `output`, in write order: files first, then
/// the console table.
pub fn open_sinks(output: &OutputConfig) -> Result<Vec<Box<dyn SnapshotSink>>> {
    let mut sinks: Vec<Box<dyn SnapshotSink>> = Vec::new();

    if output.sinks.csv() {
        sinks.push(Box::new(CsvSink::open(&output.csv_path)?));
    }
    if output.sinks.sqlite() {
        sinks.push(Box::new(SnapshotStore::new(&output.sqlite_path)?));
    }
    if output.print_table {
        sinks.push(Box::new(ConsoleSink));
    }

    let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
    info!(sinks = ?names, "Output sinks opened");
    Ok(sinks)
}

/// Decimal text as stored in every sink: no trailing zeros.
pub(crate) fn decimal_text(value: rust_decimal::Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkSelection;

    #[test]
    fn test_open_sinks_follows_selection() {
        let output = OutputConfig {
            sqlite_path: ":memory:".to_string(),
            sinks: SinkSelection::Sqlite,
            print_table: true,
            ..OutputConfig::default()
        };
        let sinks = open_sinks(&output).unwrap();
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["sqlite", "console"]);
    }

    #[test]
    fn test_open_sinks_none() {
        let output = OutputConfig {
            sinks: SinkSelection::None,
            print_table: false,
            ..OutputConfig::default()
        };
        assert!(open_sinks(&output).unwrap().is_empty());
    }
}
