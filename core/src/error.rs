//! Error types shared by the aggregation pipeline.

use std::path::PathBuf;

/// Failure reported by an artifact store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response from store: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure decoding a metrics artifact.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("artifact payload is empty")]
    Empty,

    #[error("malformed artifact payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("artifact has no recognizable metric data")]
    UnknownShape,
}

/// Failure loading test descriptions.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("job {job}: unknown perfDashJobType {job_type:?}")]
    UnknownJobType { job: String, job_type: String },

    #[error("job {job}: invalid {annotation} value {value:?}")]
    InvalidAnnotation {
        job: String,
        annotation: &'static str,
        value: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
