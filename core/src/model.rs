//! Metric data model
//!
//! These are the values the dashboard renders: a [`DataPoint`] per measurement,
//! grouped per build inside a [`BuildSeries`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build number as issued by the CI system.
pub type BuildNumber = u64;

/// Label key carrying the metric name of a data point.
pub const METRIC_LABEL: &str = "Metric";

/// One measurement taken during a build.
///
/// All points sharing a label combination are expected to carry the same
/// bucket keys and unit. This is not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Bucket name to value, e.g. `"Perc90" -> 23.5`
    #[serde(default)]
    pub data: BTreeMap<String, f64>,
    /// Unit shared by every bucket
    #[serde(default)]
    pub unit: String,
    /// Label set identifying the series
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl DataPoint {
    /// Create a point carrying only a metric label.
    pub fn new(metric: impl Into<String>, unit: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(METRIC_LABEL.to_string(), metric.into());
        Self {
            data: BTreeMap::new(),
            unit: unit.into(),
            labels,
        }
    }

    /// Builder-style bucket insertion.
    pub fn with_bucket(mut self, bucket: impl Into<String>, value: f64) -> Self {
        self.data.insert(bucket.into(), value);
        self
    }

    pub fn metric(&self) -> Option<&str> {
        self.labels.get(METRIC_LABEL).map(String::as_str)
    }
}

/// History of one (job, category, metric) triple, indexed by build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSeries {
    /// Build identifier to the points produced by that build
    pub builds: BTreeMap<String, Vec<DataPoint>>,
    /// CI job the builds belong to
    pub job: String,
    /// Result format version, empty when unknown
    pub version: String,
}

impl BuildSeries {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            builds: BTreeMap::new(),
            job: job.into(),
            version: String::new(),
        }
    }

    /// Points recorded for `build`, if any.
    pub fn build(&self, build: BuildNumber) -> Option<&[DataPoint]> {
        self.builds.get(&build.to_string()).map(Vec::as_slice)
    }
}
