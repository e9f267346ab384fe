//! Result Tree
//!
//! Four-level mapping job → category → metric → [`BuildSeries`]. A tree is
//! filled by the downloader through a [`TreeWriter`] and is read-only once it
//! has been published.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::model::{BuildNumber, BuildSeries, DataPoint};
use crate::parser::ParsedArtifact;

pub type MetricToBuildData = HashMap<String, BuildSeries>;
pub type CategoryToMetricData = HashMap<String, MetricToBuildData>;

/// Location of one series inside the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub job: String,
    pub category: String,
    pub metric: String,
}

impl SeriesKey {
    pub fn new(
        job: impl Into<String>,
        category: impl Into<String>,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            job: job.into(),
            category: category.into(),
            metric: metric.into(),
        }
    }
}

/// Job → category → metric → series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTree {
    jobs: HashMap<String, CategoryToMetricData>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Append the points `artifact` produced for `build`.
    ///
    /// A missing series is created with `job = source_job` and an empty
    /// version; the first declared version is kept.
    pub fn merge(
        &mut self,
        key: SeriesKey,
        source_job: &str,
        build: BuildNumber,
        artifact: ParsedArtifact,
    ) {
        let series = self.series_mut(key, source_job, artifact.version);
        series
            .builds
            .entry(build.to_string())
            .or_default()
            .extend(artifact.points);
    }

    /// Set the points of `build` to `points`, dropping whatever was there.
    pub fn replace_build(
        &mut self,
        key: SeriesKey,
        source_job: &str,
        build: BuildNumber,
        version: Option<String>,
        points: Vec<DataPoint>,
    ) {
        let series = self.series_mut(key, source_job, version);
        series.builds.insert(build.to_string(), points);
    }

    fn series_mut(
        &mut self,
        key: SeriesKey,
        source_job: &str,
        version: Option<String>,
    ) -> &mut BuildSeries {
        let series = self
            .jobs
            .entry(key.job)
            .or_default()
            .entry(key.category)
            .or_default()
            .entry(key.metric)
            .or_insert_with(|| BuildSeries::new(source_job));

        if series.version.is_empty() {
            if let Some(version) = version {
                series.version = version;
            }
        }
        series
    }

    /// Sorted job names.
    pub fn job_names(&self) -> Vec<String> {
        sorted_keys(&self.jobs)
    }

    /// Sorted category names of `job`, `None` if the job is unknown.
    pub fn category_names(&self, job: &str) -> Option<Vec<String>> {
        self.jobs.get(job).map(sorted_keys)
    }

    /// Sorted metric names of `job`/`category`, `None` if either is unknown.
    pub fn metric_names(&self, job: &str, category: &str) -> Option<Vec<String>> {
        self.jobs
            .get(job)
            .and_then(|categories| categories.get(category))
            .map(sorted_keys)
    }

    pub fn build_series(&self, job: &str, category: &str, metric: &str) -> Option<&BuildSeries> {
        self.jobs
            .get(job)
            .and_then(|categories| categories.get(category))
            .and_then(|metrics| metrics.get(metric))
    }

    /// Number of (job, category, metric) series.
    pub fn series_count(&self) -> usize {
        self.jobs
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Concurrent front end used while a refresh cycle fills a tree.
///
/// Points are tracked per source artifact. Distinct artifacts landing on the
/// same build accumulate, ordered by source job and artifact path whatever
/// the merge order. Merging an artifact again replaces its earlier points.
///
/// The lock is held for a single merge only; callers fetch and parse before
/// calling [`TreeWriter::merge`].
#[derive(Debug, Default)]
pub struct TreeWriter {
    state: Mutex<WriterState>,
}

#[derive(Debug, Default)]
struct WriterState {
    tree: ResultTree,
    /// (series, build) → (source job, artifact path) → points
    artifacts: HashMap<(SeriesKey, BuildNumber), BTreeMap<(String, String), Vec<DataPoint>>>,
}

impl TreeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the points parsed from `artifact_path` of `build`.
    pub async fn merge(
        &self,
        key: SeriesKey,
        source_job: &str,
        build: BuildNumber,
        artifact_path: &str,
        artifact: ParsedArtifact,
    ) {
        let mut state = self.state.lock().await;
        let parts = state.artifacts.entry((key.clone(), build)).or_default();
        parts.insert(
            (source_job.to_string(), artifact_path.to_string()),
            artifact.points,
        );
        let points = parts.values().flatten().cloned().collect();
        state
            .tree
            .replace_build(key, source_job, build, artifact.version, points);
    }

    /// Copy of the tree as merged so far.
    pub async fn snapshot(&self) -> ResultTree {
        self.state.lock().await.tree.clone()
    }

    pub fn into_tree(self) -> ResultTree {
        self.state.into_inner().tree
    }
}
