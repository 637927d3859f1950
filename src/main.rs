//! Spread Collector - Main Entry Point

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use spread_collector::collector::SnapshotCollector;
use spread_collector::config::{Config, SinkSelection};
use spread_collector::display::format_ticker;
use spread_collector::exchange::{
    build_http_client, BinanceClient, BinanceWebSocket, KucoinClient, KucoinWebSocket, TickerFeed,
};
use spread_collector::persistence::{open_sinks, SnapshotStore};
use spread_collector::scheduler::CycleScheduler;
use spread_collector::stream::{run_reader, ReconnectPolicy};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Spread Collector CLI
#[derive(Parser)]
#[command(name = "spread-collector")]
#[command(version, about = "Binance/KuCoin bid-ask spread and slippage collector")]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll both venues every interval and write snapshots (default)
    Collect(CollectArgs),

    /// Print live book-ticker updates from one venue
    Stream {
        #[arg(value_enum)]
        venue: StreamVenue,

        /// Reconnect and resubscribe after a failed session
        #[arg(long)]
        reconnect: bool,

        /// Markets to subscribe, e.g. BTC/USDT,ETH/USDT
        #[arg(short, long, value_delimiter = ',')]
        markets: Vec<String>,
    },

    /// Summarise the SQLite snapshot store
    Status {
        /// Path to SQLite database
        #[arg(short, long, default_value = "data/market_data.db")]
        db: String,

        /// Also show the most recent snapshots
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args, Default)]
struct CollectArgs {
    /// Seconds between cycles
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many cycles
    #[arg(short, long)]
    cycles: Option<u64>,

    /// Persistence sinks to write
    #[arg(long, value_enum)]
    sink: Option<SinkSelection>,

    /// Markets to collect, e.g. BTC/USDT,ETH/USDT
    #[arg(short, long, value_delimiter = ',')]
    markets: Vec<String>,

    /// Do not print the per-cycle table
    #[arg(long)]
    no_table: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StreamVenue {
    Binance,
    Kucoin,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.log_json)?;

    match cli.command.unwrap_or_else(|| Commands::Collect(CollectArgs::default())) {
        Commands::Collect(args) => run_collect(args).await,
        Commands::Stream {
            venue,
            reconnect,
            markets,
        } => run_stream(venue, reconnect, markets).await,
        Commands::Status { db, verbose } => show_status(&db, verbose),
    }
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging(json: bool) -> Result<WorkerGuard> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "spread-collector.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::from_default_env()
        .add_directive("spread_collector=debug".parse()?)
        .add_directive(Level::INFO.into());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stdout.and(file_writer))
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stdout.and(file_writer))
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true)
            .init();
    }

    Ok(guard)
}

/// Broadcast shutdown on Ctrl+C.
fn spawn_shutdown_listener() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });
    shutdown_rx
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("Configuration:");
    info!("   Markets: {}", config.collector.markets.join(", "));
    info!("   Interval: {}s", config.collector.interval_secs);
    info!("   Request Timeout: {}s", config.collector.request_timeout_secs);
    info!("   Slippage Factor: {}", config.collector.slippage_factor);
    info!(
        "   Retry: {} attempts, {}ms..{}ms backoff",
        config.retry.max_attempts, config.retry.initial_backoff_ms, config.retry.max_backoff_ms
    );
    info!("   Sinks: {:?}", config.output.sinks);
    if config.output.sinks.csv() {
        info!("   CSV Path: {}", config.output.csv_path);
    }
    if config.output.sinks.sqlite() {
        info!("   SQLite Path: {}", config.output.sqlite_path);
    }
}

async fn run_collect(args: CollectArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(interval) = args.interval {
        config.collector.interval_secs = interval;
    }
    if let Some(sink) = args.sink {
        config.output.sinks = sink;
    }
    if !args.markets.is_empty() {
        config.collector.markets = args.markets;
    }
    if args.no_table {
        config.output.print_table = false;
    }
    config.validate()?;

    info!(
        "Spread Collector v{} - collection mode",
        env!("CARGO_PKG_VERSION")
    );
    log_config(&config);

    let markets = config.markets()?;
    let http = build_http_client(config.request_timeout())?;
    let kucoin = Arc::new(KucoinClient::new(&config.kucoin, http.clone()));
    let binance = Arc::new(BinanceClient::new(&config.binance, http));

    let collector = SnapshotCollector::new(
        kucoin,
        binance,
        config.snapshot_settings(),
        config.retry_policy(),
    );
    let sinks = open_sinks(&config.output)?;

    let mut scheduler = CycleScheduler::new(collector, markets, sinks, config.interval())
        .with_max_cycles(args.cycles);
    let summary = scheduler.run(spawn_shutdown_listener()).await;

    info!(
        "Collected {} snapshots over {} cycles ({} markets skipped)",
        summary.snapshots, summary.cycles, summary.skipped
    );
    Ok(())
}

async fn run_stream(venue: StreamVenue, reconnect: bool, markets: Vec<String>) -> Result<()> {
    let mut config = Config::load()?;
    if reconnect {
        config.stream.reconnect = true;
    }
    if !markets.is_empty() {
        config.collector.markets = markets;
    }
    config.validate()?;

    let markets = config.markets()?;
    let feed: Box<dyn TickerFeed> = match venue {
        StreamVenue::Binance => Box::new(BinanceWebSocket::new(&config.binance, markets)),
        StreamVenue::Kucoin => {
            let http = build_http_client(config.request_timeout())?;
            let client = KucoinClient::new(&config.kucoin, http);
            Box::new(KucoinWebSocket::new(&config.kucoin, client, markets))
        }
    };

    let policy = ReconnectPolicy::from(&config.stream);
    info!(
        venue = %feed.venue(),
        reconnect = policy.enabled,
        "Starting ticker stream"
    );

    let delivered = run_reader(feed.as_ref(), &policy, spawn_shutdown_listener(), |update| {
        println!("{}", format_ticker(update));
    })
    .await?;

    info!("Stream finished after {} updates", delivered);
    Ok(())
}

/// Show a summary of the snapshot store.
fn show_status(db_path: &str, verbose: bool) -> Result<()> {
    use std::path::Path;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              SPREAD COLLECTOR STATUS                       ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    if !Path::new(db_path).exists() {
        println!("\n❌ Database not found: {}", db_path);
        println!("   The collector has not written to SQLite yet, or the database path is incorrect.");
        return Ok(());
    }

    let store = SnapshotStore::new(db_path)?;
    let summaries = store.market_summaries()?;

    if summaries.is_empty() {
        println!("\n❌ No snapshots stored yet.");
        return Ok(());
    }

    println!("\n📊 Store Summary");
    println!("   ├─ Markets:          {}", summaries.len());
    println!("   └─ Total Snapshots:  {}", store.row_count()?);

    println!("\n📈 Markets");
    for summary in &summaries {
        println!("   ┌─ {}", summary.market);
        println!("   ├─ Snapshots:        {}", summary.rows);
        if let Some(latest) = summary.latest {
            println!("   ├─ Latest:           {}", latest.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("   ├─ Avg KuCoin Spread:  {:.5}%", summary.avg_kucoin_spread_pct);
        println!("   └─ Avg Binance Spread: {:.5}%", summary.avg_binance_spread_pct);
    }

    if verbose {
        let recent = store.recent_snapshots(10)?;
        if !recent.is_empty() {
            println!("\n🕒 Recent Snapshots");
            for s in &recent {
                println!(
                    "   ├─ {} {}: KC {}/{} ({}%) BN {}/{} ({}%)",
                    s.observed_at.format("%Y-%m-%d %H:%M:%S"),
                    s.market,
                    s.kucoin_bid,
                    s.kucoin_ask,
                    s.kucoin_spread_pct,
                    s.binance_bid,
                    s.binance_ask,
                    s.binance_spread_pct
                );
            }
        }
    }

    println!();
    Ok(())
}
