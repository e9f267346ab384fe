//! Query Service
//!
//! Read-only lookups over the most recently published [`ResultTree`]. A
//! published tree is never modified; the next refresh cycle publishes a new
//! one by swapping the snapshot pointer, so readers never see a partially
//! merged tree and never wait on the downloader.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::model::BuildSeries;
use crate::tree::ResultTree;

/// A published tree together with when it was produced.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tree: ResultTree,
    /// Refresh cycle that produced the tree, 0 before the first cycle
    pub cycle: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Shared handle to the current snapshot.
#[derive(Debug, Clone)]
pub struct QueryService {
    current: Arc<ArcSwap<Snapshot>>,
}

impl Default for QueryService {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryService {
    /// Service answering from an empty tree until the first publish.
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
        }
    }

    /// Replace the served tree.
    pub fn publish(&self, tree: ResultTree) -> Arc<Snapshot> {
        let cycle = self.current.load().cycle + 1;
        let snapshot = Arc::new(Snapshot {
            tree,
            cycle,
            refreshed_at: Some(Utc::now()),
        });
        self.current.store(snapshot.clone());
        snapshot
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Sorted job names.
    pub fn job_names(&self) -> Vec<String> {
        self.current.load().tree.job_names()
    }

    /// Sorted category names of `job`; empty for an unknown job.
    pub fn category_names(&self, job: &str) -> Vec<String> {
        self.current
            .load()
            .tree
            .category_names(job)
            .unwrap_or_else(|| {
                info!("unknown jobname - {}", job);
                Vec::new()
            })
    }

    /// Sorted metric names of `job`/`category`; empty when either is unknown.
    pub fn metric_names(&self, job: &str, category: &str) -> Vec<String> {
        self.current
            .load()
            .tree
            .metric_names(job, category)
            .unwrap_or_else(|| {
                info!("unknown jobname/metriccategoryname - {}/{}", job, category);
                Vec::new()
            })
    }

    pub fn build_series(&self, job: &str, category: &str, metric: &str) -> Option<BuildSeries> {
        let series = self
            .current
            .load()
            .tree
            .build_series(job, category, metric)
            .cloned();
        if series.is_none() {
            info!(
                "unknown jobname/metriccategoryname/metricname - {}/{}/{}",
                job, category, metric
            );
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataPoint;
    use crate::parser::ParsedArtifact;
    use crate::tree::SeriesKey;

    fn tree_with(job: &str, category: &str, metric: &str) -> ResultTree {
        let mut tree = ResultTree::new();
        tree.merge(
            SeriesKey::new(job, category, metric),
            job,
            1,
            ParsedArtifact {
                version: None,
                points: vec![DataPoint::new(metric, "ms").with_bucket("Perc50", 1.0)],
            },
        );
        tree
    }

    #[test]
    fn test_empty_before_first_publish() {
        let service = QueryService::new();
        assert!(service.job_names().is_empty());
        assert_eq!(service.snapshot().cycle, 0);
        assert!(service.snapshot().refreshed_at.is_none());
    }

    #[test]
    fn test_absent_keys_return_empty() {
        let service = QueryService::new();
        service.publish(tree_with("j", "c", "m"));

        assert!(service.category_names("nope").is_empty());
        assert!(service.metric_names("j", "nope").is_empty());
        assert!(service.metric_names("nope", "c").is_empty());
        assert!(service.build_series("nope", "nope", "nope").is_none());
        assert!(service.build_series("j", "c", "nope").is_none());
    }

    #[test]
    fn test_publish_swaps_whole_tree() {
        let service = QueryService::new();
        service.publish(tree_with("old", "c", "m"));
        let held = service.snapshot();

        let snapshot = service.publish(tree_with("new", "c", "m"));
        assert_eq!(snapshot.cycle, 2);
        assert_eq!(service.job_names(), vec!["new"]);
        assert_eq!(service.category_names("new"), vec!["c"]);
        assert_eq!(service.metric_names("new", "c"), vec!["m"]);
        assert_eq!(service.build_series("new", "c", "m").unwrap().job, "new");

        // Readers holding the previous snapshot keep a consistent view.
        assert_eq!(held.tree.job_names(), vec!["old"]);
    }

    #[test]
    fn test_clones_share_the_snapshot() {
        let service = QueryService::new();
        let reader = service.clone();
        service.publish(tree_with("j", "c", "m"));
        assert_eq!(reader.job_names(), vec!["j"]);
    }
}
