//! Live ticker stream readers.
//!
//! A reader drives one [`TickerFeed`] and hands every decoded update to a
//! consumer. Without reconnect the first session error ends the reader.
//! With reconnect a failed session is followed by a fresh
//! connect-and-subscribe after an exponentially growing delay.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::config::StreamConfig;
use crate::exchange::{StreamError, TickerFeed, TickerUpdate};

const CHANNEL_CAPACITY: usize = 256;

/// Outer reconnect behaviour around single sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&StreamConfig> for ReconnectPolicy {
    fn from(config: &StreamConfig) -> Self {
        Self {
            enabled: config.reconnect,
            initial_delay: Duration::from_millis(config.initial_reconnect_delay_ms),
            max_delay: Duration::from_secs(config.max_reconnect_delay_secs),
        }
    }
}

/// Run sessions of `feed` until shutdown, a fatal error, or the receiver
/// going away.
///
/// Returns `Ok(())` on shutdown or when `tx` has no receiver left.
pub async fn run_with_reconnect(
    feed: &dyn TickerFeed,
    tx: mpsc::Sender<TickerUpdate>,
    policy: &ReconnectPolicy,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), StreamError> {
    let venue = feed.venue();
    let mut reconnect_delay = policy.initial_delay;

    loop {
        if shutdown.try_recv().is_ok() {
            info!(%venue, "Stream reader: shutdown signal received");
            return Ok(());
        }

        let result = tokio::select! {
            result = feed.run_session(tx.clone()) => result,
            _ = shutdown.recv() => {
                info!(%venue, "Stream reader: shutdown during session");
                return Ok(());
            }
        };

        match result {
            Ok(()) => {
                info!(%venue, "Stream reader: consumer closed");
                return Ok(());
            }
            Err(e) if !policy.enabled => {
                error!(%venue, error = %e, "Stream session failed");
                return Err(e);
            }
            Err(e) => {
                warn!(%venue, "Stream session error: {e}, reconnecting in {reconnect_delay:?}");

                tokio::select! {
                    _ = tokio::time::sleep(reconnect_delay) => {}
                    _ = shutdown.recv() => {
                        info!(%venue, "Stream reader: shutdown during reconnect delay");
                        return Ok(());
                    }
                }

                reconnect_delay = (reconnect_delay * 2).min(policy.max_delay);
            }
        }
    }
}

/// Drive `feed` and pass every update to `on_update`.
///
/// Returns the number of updates delivered once the feed stops.
pub async fn run_reader<F>(
    feed: &dyn TickerFeed,
    policy: &ReconnectPolicy,
    mut shutdown: broadcast::Receiver<()>,
    mut on_update: F,
) -> Result<u64, StreamError>
where
    F: FnMut(&TickerUpdate),
{
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

    let driver = run_with_reconnect(feed, tx, policy, &mut shutdown);
    let consumer = async {
        let mut delivered = 0u64;
        while let Some(update) = rx.recv().await {
            on_update(&update);
            delivered += 1;
        }
        delivered
    };

    let (result, delivered) = tokio::join!(driver, consumer);
    info!(venue = %feed.venue(), delivered, "Stream reader stopped");
    result.map(|_| delivered)
}
