//! Metric Parser
//!
//! Decodes raw artifact payloads into [`DataPoint`]s. Parsing is tolerant in
//! the sense that it never panics: an empty or malformed payload is reported
//! as a [`ParseError`] and the caller decides what to skip.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::model::DataPoint;

/// Artifact formats understood by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParserKind {
    /// `{"builds": [...]}` or `{"version": .., "dataItems": [...]}`
    #[default]
    PerfData,
    /// Resource usage summary keyed by percentile
    ResourceUsage,
}

/// Result of decoding one artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArtifact {
    /// Format version declared by the artifact, if any
    pub version: Option<String>,
    /// Data points in document order
    pub points: Vec<DataPoint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PerfDocument {
    Builds {
        builds: Vec<DataPoint>,
        #[serde(default)]
        version: Option<String>,
    },
    DataItems {
        #[serde(rename = "dataItems")]
        data_items: Vec<DataPoint>,
        #[serde(default)]
        version: Option<String>,
    },
}

#[derive(Deserialize)]
struct ContainerUsage {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Cpu", default)]
    cpu: f64,
    #[serde(rename = "Mem", default)]
    mem: u64,
}

/// Decode `raw` according to `kind`.
pub fn parse_artifact(kind: ParserKind, raw: &[u8]) -> Result<ParsedArtifact, ParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }
    match kind {
        ParserKind::PerfData => parse_perf_data(raw),
        ParserKind::ResourceUsage => parse_resource_usage(raw),
    }
}

fn parse_perf_data(raw: &[u8]) -> Result<ParsedArtifact, ParseError> {
    // Decode to a Value first so a syntax error surfaces as Malformed rather
    // than the untagged enum's generic mismatch.
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    let document: PerfDocument =
        serde_json::from_value(value).map_err(|_| ParseError::UnknownShape)?;

    let (points, version) = match document {
        PerfDocument::Builds { builds, version } => (builds, version),
        PerfDocument::DataItems {
            data_items,
            version,
        } => (data_items, version),
    };

    Ok(ParsedArtifact {
        version: version.filter(|v| !v.is_empty()),
        points,
    })
}

fn parse_resource_usage(raw: &[u8]) -> Result<ParsedArtifact, ParseError> {
    let summary: BTreeMap<String, Vec<ContainerUsage>> = serde_json::from_slice(raw)?;

    let mut usage: BTreeMap<String, (DataPoint, DataPoint)> = BTreeMap::new();
    for (percentile, containers) in &summary {
        let bucket = format!("Perc{percentile}");
        for container in containers {
            let (cpu, memory) = usage
                .entry(container.name.clone())
                .or_insert_with(|| usage_points(&container.name));
            cpu.data.insert(bucket.clone(), container.cpu);
            memory
                .data
                .insert(bucket.clone(), container.mem as f64 / (1024.0 * 1024.0));
        }
    }

    let points = usage
        .into_values()
        .flat_map(|(cpu, memory)| [cpu, memory])
        .collect();

    Ok(ParsedArtifact {
        version: Some("v1".to_string()),
        points,
    })
}

fn usage_points(name: &str) -> (DataPoint, DataPoint) {
    let point = |resource: &str, unit: &str| {
        let mut labels = BTreeMap::new();
        labels.insert("Name".to_string(), name.to_string());
        labels.insert("Resource".to_string(), resource.to_string());
        DataPoint {
            data: BTreeMap::new(),
            unit: unit.to_string(),
            labels,
        }
    };
    (point("CPU", "cores"), point("memory", "MiB"))
}
