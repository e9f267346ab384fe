//! Periodic refresh of the served tree.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::TestDescription;
use crate::downloader::{CollectStats, Downloader};
use crate::query::{QueryService, Snapshot};

/// Rebuilds the result tree from scratch and publishes it.
pub struct Refresher {
    downloader: Downloader,
    descriptions: Arc<Vec<TestDescription>>,
    query: QueryService,
}

impl Refresher {
    pub fn new(
        downloader: Downloader,
        descriptions: Vec<TestDescription>,
        query: QueryService,
    ) -> Self {
        Self {
            downloader,
            descriptions: Arc::new(descriptions),
            query,
        }
    }

    /// Run one cycle and publish its tree.
    pub async fn refresh_once(&self) -> (Arc<Snapshot>, CollectStats) {
        let (tree, stats) = self.downloader.collect(&self.descriptions).await;
        let snapshot = self.query.publish(tree);
        info!(
            "Published refresh cycle {} with {} jobs",
            snapshot.cycle,
            snapshot.tree.job_names().len()
        );
        (snapshot, stats)
    }

    /// Refresh now and then every `period` until `shutdown` is cancelled.
    ///
    /// A cycle interrupted by cancellation is dropped without publishing.
    pub async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!("Refresh cycle abandoned on shutdown");
                    break;
                }
                _ = self.refresh_once() => {}
            }
        }
        info!("Refresh loop stopped");
    }
}
