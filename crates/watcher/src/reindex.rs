//! Periodic re-indexing
//!
//! Re-walks the index root on a fixed interval so directories created or
//! deleted outside of any shell history still show up (or disappear).

use anyhow::{Context, Result};
use dirdex_core::{Indexer, PassStats};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Run one pass on the blocking pool
pub async fn run_pass(indexer: &Indexer) -> Result<PassStats> {
    let indexer = indexer.clone();
    tokio::task::spawn_blocking(move || indexer.reindex())
        .await
        .context("Index pass panicked")?
}

/// Periodic re-indexer
///
/// Passes run one after another: the next tick is only awaited once the
/// previous pass has been applied.
pub struct PeriodicIndexer {
    indexer: Indexer,

    /// Time between passes
    interval: Duration,
}

impl PeriodicIndexer {
    pub fn new(indexer: Indexer, interval: Duration) -> Self {
        Self { indexer, interval }
    }

    /// Run the re-index loop forever.
    ///
    /// The first pass happens one interval after the call; the startup pass
    /// is expected to have run already.
    pub async fn run(self) {
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting periodic re-index of {} (interval: {:?})",
            self.indexer.root().display(),
            self.interval
        );

        loop {
            timer.tick().await;
            debug!("Kicking off directory walk");

            match run_pass(&self.indexer).await {
                Ok(stats) if stats.removed > 0 => {
                    info!("Re-index removed {} vanished directories", stats.removed);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Periodic re-index failed, keeping previous index: {:#}", e);
                }
            }
        }
    }
}
