//! Perfdash Core Module
//!
//! The core module collects performance-test results produced by CI builds
//! and organizes them into a queryable hierarchy (job → category → metric →
//! build). It contains the aggregation engine, the metric parser, the result
//! tree and the read-only query service on top of it.

pub mod config;
pub mod downloader;
pub mod error;
pub mod model;
pub mod parser;
pub mod path;
pub mod query;
pub mod refresh;
pub mod store;
pub mod tree;

pub use config::{load_test_descriptions, DownloaderOptions, TestDescription};
pub use downloader::{resolve_category, CollectStats, Downloader};
pub use error::{ConfigError, ParseError, StoreError, StoreResult};
pub use model::{BuildNumber, BuildSeries, DataPoint};
pub use parser::{parse_artifact, ParsedArtifact, ParserKind};
pub use path::{join_path, PathSegment};
pub use query::{QueryService, Snapshot};
pub use refresh::Refresher;
pub use store::{ArtifactStore, MemoryStore};
pub use tree::{ResultTree, SeriesKey, TreeWriter};
