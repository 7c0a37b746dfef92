//! Timer-driven rebuild of the routing table.
//!
//! One loop per process: list the registry, build a fresh table, install it.
//! Builds never overlap because the loop awaits each one before the next tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DnsError;
use crate::metrics::{self, RefreshResult, Timer};
use crate::registry::Registry;
use crate::state::SnapshotStore;
use crate::table::{BuildReport, TableBuilder};

/// Default interval between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Periodically rebuilds the routing table from a registry.
pub struct RefreshLoop {
    registry: Arc<dyn Registry>,
    store: SnapshotStore,
    interval: Duration,
}

impl RefreshLoop {
    /// Create a loop publishing into `store` every `interval`.
    pub fn new(registry: Arc<dyn Registry>, store: SnapshotStore, interval: Duration) -> Self {
        Self {
            registry,
            store,
            interval,
        }
    }

    /// List, build and install once.
    ///
    /// If listing fails the current table stays installed.
    pub async fn refresh_once(&self) -> Result<BuildReport, DnsError> {
        let timer = Timer::start();
        let registry = self.registry.clone();

        let listed = tokio::task::spawn_blocking(move || registry.list()).await?;
        let listing = match listed {
            Ok(listing) => listing,
            Err(e) => {
                metrics::record_refresh(RefreshResult::Error, timer.elapsed());
                return Err(e.into());
            }
        };

        let mut builder = TableBuilder::new();
        builder.add_undecodable(listing.rejected);
        for entry in &listing.entries {
            builder.add(entry);
        }
        let (table, report) = builder.finish();
        let generation = self.store.replace(table);

        metrics::record_build(&report);
        metrics::record_refresh(RefreshResult::Ok, timer.elapsed());
        debug!(
            generation,
            entries = report.entries,
            accepted = report.accepted,
            invalid = report.invalid,
            externally_resolved = report.externally_resolved,
            no_addresses = report.no_addresses,
            patterns = report.patterns,
            "refreshed routing table"
        );

        Ok(report)
    }

    /// Refresh every `interval` until `shutdown` fires. The first tick comes
    /// one interval after the call; callers build the initial table with
    /// [`RefreshLoop::refresh_once`].
    ///
    /// The registry is stopped on the way out.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "refresh loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("refresh loop received shutdown signal");
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.refresh_once().await {
                        warn!("Failed to refresh routing table, keeping previous table: {}", e);
                    }
                }
            }
        }

        self.registry.stop();
    }
}
