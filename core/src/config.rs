//! Test Description Configuration
//!
//! Test descriptions tell the downloader which artifacts to collect for a job
//! and where to put them in the result tree. They come from two sources,
//! loaded in this order:
//!
//! - description files listing jobs and their categories explicitly
//! - job directories holding prow-style job definitions, where jobs opt in
//!   through `perfDash*` annotations and get a built-in description table
//!   chosen by their job type

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::parser::ParserKind;
use crate::path::{join_path, PathSegment};

/// Artifacts directory used when a job does not name one.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

const PREFIX_ANNOTATION: &str = "perfDashPrefix";
const JOB_TYPE_ANNOTATION: &str = "perfDashJobType";
const BUILDS_COUNT_ANNOTATION: &str = "perfDashBuildsCount";
const ARTIFACTS_DIR_ANNOTATION: &str = "perfDashArtifactsDir";

/// One thing to aggregate for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescription {
    /// CI job name used to address the store
    pub job: String,
    /// Top-level tree key; the job name when not set
    pub dashboard_job: Option<String>,
    /// Leading part of the artifact file names
    pub output_file_prefix: String,
    /// Optional second part of the file name prefix
    pub name: Option<String>,
    /// Category label in the tree
    pub category: String,
    /// Metric label in the tree
    pub metric: String,
    /// Builds to retrieve; the global default when not set
    pub builds_count: Option<usize>,
    /// Directory inside a build holding the artifacts
    pub artifacts_dir: String,
    pub parser: ParserKind,
}

impl TestDescription {
    /// Description with default artifacts directory and parser.
    pub fn new(
        job: impl Into<String>,
        output_file_prefix: impl Into<String>,
        category: impl Into<String>,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            job: job.into(),
            dashboard_job: None,
            output_file_prefix: output_file_prefix.into(),
            name: None,
            category: category.into(),
            metric: metric.into(),
            builds_count: None,
            artifacts_dir: DEFAULT_ARTIFACTS_DIR.to_string(),
            parser: ParserKind::default(),
        }
    }

    /// Key of this description's job in the result tree.
    pub fn tree_job(&self) -> &str {
        self.dashboard_job.as_deref().unwrap_or(&self.job)
    }

    /// File name prefix: `{outputFilePrefix}_{name}`, or just the output
    /// prefix when there is no name.
    pub fn file_prefix(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => format!("{}_{}", self.output_file_prefix, name),
            _ => self.output_file_prefix.clone(),
        }
    }

    /// Prefix handed to the store when listing a build's artifacts.
    pub fn artifact_search_prefix(&self) -> String {
        let file_prefix = self.file_prefix();
        join_path(&[
            PathSegment::Text(&self.artifacts_dir),
            PathSegment::Text(&file_prefix),
        ])
    }
}

/// Options controlling how many builds the downloader fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderOptions {
    /// Builds per job when a description does not set its own count
    pub default_builds_count: usize,
    /// Development only: use `default_builds_count` for every job
    pub override_builds_count: bool,
    /// Fetch every build the store knows about
    pub fetch_all_builds: bool,
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        Self {
            default_builds_count: 100,
            override_builds_count: false,
            fetch_all_builds: false,
        }
    }
}

impl DownloaderOptions {
    /// Number of builds to fetch for `description`, `None` meaning all.
    pub fn builds_window(&self, description: &TestDescription) -> Option<usize> {
        if self.fetch_all_builds {
            return None;
        }
        if self.override_builds_count {
            return Some(self.default_builds_count);
        }
        Some(
            description
                .builds_count
                .unwrap_or(self.default_builds_count),
        )
    }
}

/// Metric label → descriptions for that metric.
pub type MetricDescriptions = BTreeMap<String, Vec<DescriptionEntry>>;

/// File-level description entry, before it is bound to a job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionEntry {
    pub output_file_prefix: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parser: ParserKind,
}

/// Job section of a description file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    pub job: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub builds_count: Option<usize>,
    #[serde(default)]
    pub artifacts_dir: Option<String>,
    /// Category → metric → descriptions
    #[serde(default)]
    pub categories: BTreeMap<String, MetricDescriptions>,
}

impl JobEntry {
    /// Flatten into one [`TestDescription`] per (category, metric, entry).
    pub fn descriptions(&self) -> Vec<TestDescription> {
        let artifacts_dir = self
            .artifacts_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.to_string());

        let mut result = Vec::new();
        for (category, metrics) in &self.categories {
            for (metric, entries) in metrics {
                for entry in entries {
                    result.push(TestDescription {
                        job: self.job.clone(),
                        dashboard_job: self.prefix.clone(),
                        output_file_prefix: entry.output_file_prefix.clone(),
                        name: entry.name.clone(),
                        category: category.clone(),
                        metric: metric.clone(),
                        builds_count: self.builds_count,
                        artifacts_dir: artifacts_dir.clone(),
                        parser: entry.parser,
                    });
                }
            }
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct DescriptionFile {
    #[serde(default)]
    jobs: Vec<JobEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ProwConfig {
    #[serde(default)]
    periodics: Vec<ProwJob>,
    #[serde(default)]
    presubmits: HashMap<String, Vec<ProwJob>>,
    #[serde(default)]
    postsubmits: HashMap<String, Vec<ProwJob>>,
}

#[derive(Debug, Deserialize)]
struct ProwJob {
    name: String,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

impl ProwConfig {
    fn into_jobs(self) -> impl Iterator<Item = ProwJob> {
        self.periodics
            .into_iter()
            .chain(self.presubmits.into_values().flatten())
            .chain(self.postsubmits.into_values().flatten())
    }
}

/// Parse a description file's YAML content.
pub fn parse_description_file(content: &str) -> Result<Vec<TestDescription>, serde_yaml::Error> {
    let file: DescriptionFile = serde_yaml::from_str(content)?;
    Ok(file.jobs.iter().flat_map(JobEntry::descriptions).collect())
}

/// Load descriptions from description files and prow job directories.
pub fn load_test_descriptions(
    config_paths: &[PathBuf],
    job_config_dirs: &[PathBuf],
) -> Result<Vec<TestDescription>, ConfigError> {
    let mut descriptions = Vec::new();

    for path in config_paths {
        let content = read(path)?;
        let loaded = parse_description_file(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        info!(
            "Loaded {} test descriptions from {}",
            loaded.len(),
            path.display()
        );
        descriptions.extend(loaded);
    }

    for dir in job_config_dirs {
        let loaded = discover_job_directory(dir)?;
        info!(
            "Discovered {} test descriptions in {}",
            loaded.len(),
            dir.display()
        );
        descriptions.extend(loaded);
    }

    Ok(descriptions)
}

/// Scan `dir` recursively for prow job files and build descriptions for the
/// jobs annotated for the dashboard.
pub fn discover_job_directory(dir: &Path) -> Result<Vec<TestDescription>, ConfigError> {
    let mut files = Vec::new();
    collect_yaml_files(dir, &mut files)?;
    files.sort();

    let mut descriptions = Vec::new();
    for file in files {
        let content = read(&file)?;
        let config: ProwConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: file.clone(),
                source,
            })?;
        for job in config.into_jobs() {
            descriptions.extend(descriptions_for_prow_job(&job)?);
        }
    }
    Ok(descriptions)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::Read {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

fn descriptions_for_prow_job(job: &ProwJob) -> Result<Vec<TestDescription>, ConfigError> {
    let (Some(prefix), Some(job_type)) = (
        job.annotations.get(PREFIX_ANNOTATION),
        job.annotations.get(JOB_TYPE_ANNOTATION),
    ) else {
        debug!("Skipping job {} without perfDash annotations", job.name);
        return Ok(Vec::new());
    };

    let table = builtin_descriptions(job_type).ok_or_else(|| ConfigError::UnknownJobType {
        job: job.name.clone(),
        job_type: job_type.clone(),
    })?;

    let builds_count = match job.annotations.get(BUILDS_COUNT_ANNOTATION) {
        Some(value) => Some(value.trim().parse::<usize>().map_err(|_| {
            ConfigError::InvalidAnnotation {
                job: job.name.clone(),
                annotation: BUILDS_COUNT_ANNOTATION,
                value: value.clone(),
            }
        })?),
        None => None,
    };

    if prefix.is_empty() {
        warn!("Job {} has an empty {}", job.name, PREFIX_ANNOTATION);
    }

    let entry = JobEntry {
        job: job.name.clone(),
        prefix: Some(prefix.clone()).filter(|p| !p.is_empty()),
        builds_count,
        artifacts_dir: job.annotations.get(ARTIFACTS_DIR_ANNOTATION).cloned(),
        categories: table,
    };
    Ok(entry.descriptions())
}

/// Built-in description table for a `perfDashJobType`.
pub fn builtin_descriptions(job_type: &str) -> Option<BTreeMap<String, MetricDescriptions>> {
    let table: &[(&str, &str, &str, Option<&str>, ParserKind)] = match job_type {
        "performance" => &[
            ("E2E", "LoadResponsiveness", "APIResponsiveness", Some("load"), ParserKind::PerfData),
            ("E2E", "LoadPodStartup", "PodStartupLatency_PodStartupLatency", Some("load"), ParserKind::PerfData),
            ("E2E", "DensityResponsiveness", "APIResponsiveness", Some("density"), ParserKind::PerfData),
            ("E2E", "DensityPodStartup", "PodStartupLatency_PodStartupLatency", Some("density"), ParserKind::PerfData),
            ("Scheduler", "SchedulingThroughput", "SchedulingThroughput", Some("density"), ParserKind::PerfData),
            ("Resources", "DensityResourceUsage", "ResourceUsageSummary", Some("density"), ParserKind::ResourceUsage),
            ("Resources", "LoadResourceUsage", "ResourceUsageSummary", Some("load"), ParserKind::ResourceUsage),
        ],
        "benchmark" => &[
            ("Benchmark", "Throughput", "BenchmarkResults", Some("throughput"), ParserKind::PerfData),
            ("Benchmark", "Latency", "BenchmarkResults", Some("latency"), ParserKind::PerfData),
        ],
        _ => return None,
    };

    let mut categories: BTreeMap<String, MetricDescriptions> = BTreeMap::new();
    for (category, metric, prefix, name, parser) in table {
        categories
            .entry(category.to_string())
            .or_default()
            .entry(metric.to_string())
            .or_default()
            .push(DescriptionEntry {
                output_file_prefix: prefix.to_string(),
                name: name.map(str::to_string),
                parser: *parser,
            });
    }
    Some(categories)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTIONS: &str = r#"
jobs:
  - job: ci-perf-tests
    prefix: gce-100Nodes
    buildsCount: 20
    categories:
      E2E:
        Latency:
          - outputFilePrefix: E2E
            name: Latency
      Resources:
        Usage:
          - outputFilePrefix: ResourceUsageSummary
            parser: resourceUsage
  - job: ci-small
    artifactsDir: results
    categories:
      Network:
        Throughput:
          - outputFilePrefix: Netperf
"#;

    #[test]
    fn test_parse_description_file() {
        let descriptions = parse_description_file(DESCRIPTIONS).unwrap();
        assert_eq!(descriptions.len(), 3);

        let latency = &descriptions[0];
        assert_eq!(latency.job, "ci-perf-tests");
        assert_eq!(latency.tree_job(), "gce-100Nodes");
        assert_eq!(latency.category, "E2E");
        assert_eq!(latency.metric, "Latency");
        assert_eq!(latency.file_prefix(), "E2E_Latency");
        assert_eq!(latency.builds_count, Some(20));
        assert_eq!(latency.artifact_search_prefix(), "artifacts/E2E_Latency");

        assert_eq!(descriptions[1].parser, ParserKind::ResourceUsage);
        assert_eq!(descriptions[1].file_prefix(), "ResourceUsageSummary");

        let small = &descriptions[2];
        assert_eq!(small.tree_job(), "ci-small");
        assert_eq!(small.builds_count, None);
        assert_eq!(small.artifact_search_prefix(), "results/Netperf");
    }

    #[test]
    fn test_builds_window() {
        let mut description = TestDescription::new("job", "E2E", "c", "m");
        let mut options = DownloaderOptions::default();

        assert_eq!(options.builds_window(&description), Some(100));

        description.builds_count = Some(5);
        assert_eq!(options.builds_window(&description), Some(5));

        options.default_builds_count = 3;
        options.override_builds_count = true;
        assert_eq!(options.builds_window(&description), Some(3));

        options.fetch_all_builds = true;
        assert_eq!(options.builds_window(&description), None);
    }

    #[test]
    fn test_empty_name_does_not_extend_prefix() {
        let mut description = TestDescription::new("job", "E2E", "c", "m");
        description.name = Some(String::new());
        assert_eq!(description.file_prefix(), "E2E");
    }

    #[test]
    fn test_unknown_job_type_is_rejected() {
        assert!(builtin_descriptions("performance").is_some());
        assert!(builtin_descriptions("nope").is_none());
    }

    #[test]
    fn test_discover_job_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sig-scalability");
        fs::create_dir(&nested).unwrap();
        fs::write(
            nested.join("jobs.yaml"),
            r#"
periodics:
  - name: ci-kubernetes-e2e-gce-scale-performance
    interval: 24h
    annotations:
      perfDashPrefix: gce-5000Nodes
      perfDashJobType: benchmark
      perfDashBuildsCount: "30"
  - name: ci-not-on-dashboard
    annotations:
      testgrid-dashboards: sig-scalability
presubmits:
  kubernetes/kubernetes:
    - name: pull-perf-tests
      annotations:
        perfDashPrefix: pull
        perfDashJobType: benchmark
        perfDashArtifactsDir: out
"#,
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "not yaml").unwrap();

        let descriptions = discover_job_directory(dir.path()).unwrap();
        assert_eq!(descriptions.len(), 4);

        let periodic: Vec<_> = descriptions
            .iter()
            .filter(|d| d.job == "ci-kubernetes-e2e-gce-scale-performance")
            .collect();
        assert_eq!(periodic.len(), 2);
        assert!(periodic.iter().all(|d| d.builds_count == Some(30)));
        assert!(periodic.iter().all(|d| d.tree_job() == "gce-5000Nodes"));

        let presubmit = descriptions
            .iter()
            .find(|d| d.job == "pull-perf-tests")
            .unwrap();
        assert_eq!(presubmit.artifacts_dir, "out");
        assert_eq!(presubmit.builds_count, None);
    }

    #[test]
    fn test_invalid_builds_count_annotation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("jobs.yml"),
            r#"
periodics:
  - name: ci-job
    annotations:
      perfDashPrefix: x
      perfDashJobType: performance
      perfDashBuildsCount: many
"#,
        )
        .unwrap();

        let err = discover_job_directory(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAnnotation { .. }));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = load_test_descriptions(&[PathBuf::from("/nonexistent/perfdash.yaml")], &[])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
