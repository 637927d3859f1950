//! Fixed-interval collection cycles.
//!
//! A cycle is collect, then hand the batch to every sink, then sleep the
//! full interval. Cycles never overlap and a slow cycle is not compensated
//! by a shorter sleep.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::collector::SnapshotCollector;
use crate::exchange::Market;
use crate::persistence::SnapshotSink;

/// Totals reported when the scheduler stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerSummary {
    pub cycles: u64,
    pub snapshots: u64,
    pub skipped: u64,
    pub sink_errors: u64,
}

/// Owns the collector and every sink for the lifetime of a run.
pub struct CycleScheduler {
    collector: SnapshotCollector,
    markets: Vec<Market>,
    sinks: Vec<Box<dyn SnapshotSink>>,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl CycleScheduler {
    pub fn new(
        collector: SnapshotCollector,
        markets: Vec<Market>,
        sinks: Vec<Box<dyn SnapshotSink>>,
        interval: Duration,
    ) -> Self {
        Self {
            collector,
            markets,
            sinks,
            interval,
            max_cycles: None,
        }
    }

    /// Stop after `cycles` cycles instead of running until shutdown.
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Run cycles until shutdown or the cycle limit.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();
        info!(
            markets = self.markets.len(),
            interval = ?self.interval,
            sinks = self.sinks.len(),
            "Scheduler started"
        );

        loop {
            if shutdown.try_recv().is_ok() {
                info!("Scheduler: shutdown signal received");
                break;
            }

            let completed = tokio::select! {
                _ = self.run_cycle(&mut summary) => true,
                _ = shutdown.recv() => false,
            };
            if !completed {
                info!("Scheduler: shutdown during cycle");
                break;
            }

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                info!(cycles = summary.cycles, "Cycle limit reached");
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    info!("Scheduler: shutdown during interval sleep");
                    break;
                }
            }
        }

        info!(
            cycles = summary.cycles,
            snapshots = summary.snapshots,
            skipped = summary.skipped,
            sink_errors = summary.sink_errors,
            "Scheduler stopped"
        );
        summary
    }

    #[instrument(skip_all, fields(cycle = summary.cycles + 1))]
    async fn run_cycle(&mut self, summary: &mut SchedulerSummary) {
        println!("[START] {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.6f"));

        let report = self.collector.collect(&self.markets).await;
        summary.cycles += 1;
        summary.snapshots += report.snapshots.len() as u64;
        summary.skipped += report.skipped.len() as u64;

        for sink in self.sinks.iter_mut() {
            match sink.write_batch(&report.snapshots) {
                Ok(written) => {
                    info!(sink = sink.name(), written, "Batch written");
                }
                Err(e) => {
                    summary.sink_errors += 1;
                    error!(sink = sink.name(), error = %e, "Failed to write batch");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MarketSnapshot, RetryPolicy, SnapshotSettings};
    use crate::exchange::{MockQuoteSource, Quote, Venue};
    use anyhow::Result;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct RecordingSink {
        writes: Arc<Mutex<Vec<(Instant, usize)>>>,
    }

    impl SnapshotSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn write_batch(&mut self, snapshots: &[MarketSnapshot]) -> Result<usize> {
            self.writes
                .lock()
                .unwrap()
                .push((Instant::now(), snapshots.len()));
            Ok(snapshots.len())
        }
    }

    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn write_batch(&mut self, _: &[MarketSnapshot]) -> Result<usize> {
            anyhow::bail!("disk full")
        }
    }

    fn collector() -> SnapshotCollector {
        let mut kucoin = MockQuoteSource::new();
        kucoin.expect_venue().return_const(Venue::Kucoin);
        kucoin.expect_fetch_quote().returning(|_| {
            Ok(Quote::new(dec!(99), dec!(100))
                .with_time(DateTime::from_timestamp(1_700_000_000, 0).unwrap()))
        });
        let mut binance = MockQuoteSource::new();
        binance.expect_venue().return_const(Venue::Binance);
        binance
            .expect_fetch_quote()
            .returning(|_| Ok(Quote::new(dec!(99), dec!(100))));

        SnapshotCollector::new(
            Arc::new(kucoin),
            Arc::new(binance),
            SnapshotSettings::default(),
            RetryPolicy::none(),
        )
    }

    #[tokio::test]
    async fn test_cycles_do_not_overlap() {
        let interval = Duration::from_millis(50);
        let sink = RecordingSink::default();
        let markets = Market::parse_list(&["BTC/USDT", "ETH/USDT"]).unwrap();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let mut scheduler = CycleScheduler::new(
            collector(),
            markets,
            vec![Box::new(sink.clone()), Box::new(FailingSink)],
            interval,
        )
        .with_max_cycles(Some(3));
        let summary = scheduler.run(shutdown_rx).await;

        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.snapshots, 6);
        assert_eq!(summary.sink_errors, 3);

        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|(_, n)| *n == 2));
        for pair in writes.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= interval);
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_during_sleep() {
        let sink = RecordingSink::default();
        let markets = Market::parse_list(&["BTC/USDT"]).unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let mut scheduler = CycleScheduler::new(
            collector(),
            markets,
            vec![Box::new(sink.clone())],
            Duration::from_secs(3600),
        );

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(sink.writes.lock().unwrap().len(), 1);
    }
}
