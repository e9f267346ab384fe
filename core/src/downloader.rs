//! Aggregation Engine
//!
//! The [`Downloader`] turns the artifacts of every configured test
//! description into a [`ResultTree`]. Each description is collected by its own
//! task; tasks share nothing but the [`TreeWriter`].
//!
//! Artifact files follow the naming `{outputFilePrefix}_{name}...`. When a
//! build holds several files matching a prefix the job ran as a suite, and
//! the files are named `{outputFilePrefix}_{name}_{suiteId}...`. The suite id
//! is prepended to the category so suites can be compared independently.

use futures::future::join_all;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::config::{DownloaderOptions, TestDescription};
use crate::model::BuildNumber;
use crate::parser::parse_artifact;
use crate::path::base_name;
use crate::store::ArtifactStore;
use crate::tree::{ResultTree, SeriesKey, TreeWriter};

/// Counters for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub descriptions: usize,
    pub builds_visited: usize,
    pub artifacts_merged: usize,
    pub fetch_errors: usize,
    pub parse_errors: usize,
    pub failed_tasks: usize,
}

impl AddAssign for CollectStats {
    fn add_assign(&mut self, other: Self) {
        self.descriptions += other.descriptions;
        self.builds_visited += other.builds_visited;
        self.artifacts_merged += other.artifacts_merged;
        self.fetch_errors += other.fetch_errors;
        self.parse_errors += other.parse_errors;
        self.failed_tasks += other.failed_tasks;
    }
}

/// Category for `file_name` given how many files matched `file_prefix`.
///
/// With a single match the configured category is used verbatim. With more,
/// the first `_`-separated token after `{file_prefix}_`, minus its final
/// file extension, is the suite id and the result is `{suiteId}_{category}`.
pub fn resolve_category(
    file_name: &str,
    file_prefix: &str,
    category: &str,
    matching_files: usize,
) -> String {
    if matching_files <= 1 {
        return category.to_string();
    }
    let header = format!("{file_prefix}_");
    let trimmed = file_name.strip_prefix(&header).unwrap_or(file_name);
    let token = trimmed.split('_').next().unwrap_or(trimmed);
    let suite_id = token.rsplit_once('.').map_or(token, |(stem, _)| stem);
    format!("{suite_id}_{category}")
}

/// Aborts the wrapped tasks when dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Pulls artifacts from a store and merges them into result trees.
#[derive(Clone)]
pub struct Downloader {
    store: Arc<dyn ArtifactStore>,
    options: DownloaderOptions,
}

impl Downloader {
    pub fn new(store: Arc<dyn ArtifactStore>, options: DownloaderOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &DownloaderOptions {
        &self.options
    }

    /// Collect every description into a fresh tree.
    ///
    /// Descriptions run as parallel tasks. Store and parse failures are
    /// logged and counted; they never fail the cycle. Dropping the returned
    /// future aborts the tasks still running.
    pub async fn collect(&self, descriptions: &[TestDescription]) -> (ResultTree, CollectStats) {
        debug!("Collecting {} test descriptions", descriptions.len());

        let writer = Arc::new(TreeWriter::new());
        let tasks: Vec<_> = descriptions
            .iter()
            .cloned()
            .map(|description| {
                let downloader = self.clone();
                let writer = writer.clone();
                tokio::spawn(async move { downloader.collect_description(&description, &writer).await })
            })
            .collect();
        let _abort = AbortOnDrop(tasks.iter().map(|task| task.abort_handle()).collect());

        let mut stats = CollectStats::default();
        for result in join_all(tasks).await {
            match result {
                Ok(task_stats) => stats += task_stats,
                Err(e) => {
                    warn!("Aggregation task failed: {}", e);
                    stats.failed_tasks += 1;
                }
            }
        }

        let tree = match Arc::try_unwrap(writer) {
            Ok(writer) => writer.into_tree(),
            Err(shared) => shared.snapshot().await,
        };

        info!(
            "Collected {} series from {} descriptions ({} artifacts, {} fetch errors, {} parse errors)",
            tree.series_count(),
            stats.descriptions,
            stats.artifacts_merged,
            stats.fetch_errors,
            stats.parse_errors
        );
        (tree, stats)
    }

    /// Collect a single description into `writer`.
    pub async fn collect_description(
        &self,
        description: &TestDescription,
        writer: &TreeWriter,
    ) -> CollectStats {
        let mut stats = CollectStats {
            descriptions: 1,
            ..Default::default()
        };

        let builds = match self.store.list_builds(&description.job).await {
            Ok(builds) => builds,
            Err(e) => {
                warn!("Failed to list builds of {}: {}", description.job, e);
                stats.fetch_errors += 1;
                return stats;
            }
        };

        let window = self.options.builds_window(description).unwrap_or(builds.len());
        debug!(
            "Fetching {} of {} builds of {} for {}/{}",
            window.min(builds.len()),
            builds.len(),
            description.job,
            description.category,
            description.metric
        );

        for build in builds.into_iter().take(window) {
            stats.builds_visited += 1;
            self.collect_build(description, build, writer, &mut stats)
                .await;
        }
        stats
    }

    async fn collect_build(
        &self,
        description: &TestDescription,
        build: BuildNumber,
        writer: &TreeWriter,
        stats: &mut CollectStats,
    ) {
        let job = &description.job;
        let search_prefix = description.artifact_search_prefix();
        let artifacts = match self.store.list_artifacts(job, build, &search_prefix).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!("Failed to list artifacts of {}/{}: {}", job, build, e);
                stats.fetch_errors += 1;
                return;
            }
        };

        let file_prefix = description.file_prefix();
        for artifact in &artifacts {
            let category = resolve_category(
                base_name(artifact),
                &file_prefix,
                &description.category,
                artifacts.len(),
            );

            let raw = match self.store.read_artifact(job, build, artifact).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to read {} of {}/{}: {}", artifact, job, build, e);
                    stats.fetch_errors += 1;
                    continue;
                }
            };

            let parsed = match parse_artifact(description.parser, &raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Failed to parse {} of {}/{}: {}", artifact, job, build, e);
                    stats.parse_errors += 1;
                    continue;
                }
            };

            let key = SeriesKey::new(description.tree_job(), category, description.metric.clone());
            writer.merge(key, job, build, artifact, parsed).await;
            stats.artifacts_merged += 1;
        }
    }
}
