//! Perfdash Storage Module
//!
//! Artifact store backends for the aggregation engine: a local directory tree
//! and a Google Cloud Storage bucket. Both implement
//! [`perfdash_core::ArtifactStore`].

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use perfdash_core::{ArtifactStore, StoreResult};

pub mod gcs;
pub mod local;

pub use gcs::{GcsConfig, GcsStore, DEFAULT_GCS_ENDPOINT};
pub use local::LocalStore;

/// Which backend serves the artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Directory laid out as `{root}/{job}/{build}/...`
    Local { root: PathBuf },
    Gcs(GcsConfig),
}

/// Build the configured store.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ArtifactStore>> {
    match config {
        StoreConfig::Local { root } => {
            info!("Reading artifacts from local directory {}", root.display());
            Ok(Arc::new(LocalStore::new(root.clone())))
        }
        StoreConfig::Gcs(gcs) => {
            info!(
                "Reading artifacts from gs://{}/{} via {}",
                gcs.bucket, gcs.logs_path, gcs.endpoint
            );
            Ok(Arc::new(GcsStore::new(gcs.clone())?))
        }
    }
}
