//! Artifact store capability
//!
//! The downloader only needs three operations from wherever CI results live.
//! Backends are in the `perfdash-storage` crate; [`MemoryStore`] keeps
//! everything in process and backs the tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::model::BuildNumber;
use crate::path::{base_name, join_path};

/// Read access to CI build artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Build numbers known for `job`, newest first.
    async fn list_builds(&self, job: &str) -> StoreResult<Vec<BuildNumber>>;

    /// Artifact paths of `build`, relative to the build directory, whose path
    /// starts with `prefix` (for example `artifacts/E2E`).
    async fn list_artifacts(
        &self,
        job: &str,
        build: BuildNumber,
        prefix: &str,
    ) -> StoreResult<Vec<String>>;

    /// Raw content of one artifact returned by [`ArtifactStore::list_artifacts`].
    async fn read_artifact(&self, job: &str, build: BuildNumber, path: &str)
        -> StoreResult<Vec<u8>>;
}

/// In-memory store.
///
/// Jobs and files can be marked as failing to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    builds: HashMap<String, BTreeMap<BuildNumber, BTreeMap<String, Vec<u8>>>>,
    failing_jobs: HashSet<String>,
    failing_paths: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact at `path` (relative to the build directory).
    pub fn insert(
        &self,
        job: &str,
        build: BuildNumber,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> &Self {
        self.write(|inner| {
            inner
                .builds
                .entry(job.to_string())
                .or_default()
                .entry(build)
                .or_default()
                .insert(join_path(&[path.into()]), content.into());
        });
        self
    }

    /// Register a build that has no artifacts.
    pub fn insert_build(&self, job: &str, build: BuildNumber) -> &Self {
        self.write(|inner| {
            inner
                .builds
                .entry(job.to_string())
                .or_default()
                .entry(build)
                .or_default();
        });
        self
    }

    /// Make every call for `job` fail.
    pub fn fail_job(&self, job: &str) -> &Self {
        self.write(|inner| {
            inner.failing_jobs.insert(job.to_string());
        });
        self
    }

    /// Make reads of `path` fail for every job and build.
    pub fn fail_path(&self, path: &str) -> &Self {
        self.write(|inner| {
            inner.failing_paths.insert(path.to_string());
        });
        self
    }

    fn write(&self, update: impl FnOnce(&mut MemoryStoreInner)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        update(&mut guard);
    }

    fn read<T>(&self, query: impl FnOnce(&MemoryStoreInner) -> T) -> T {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        query(&guard)
    }
}

impl MemoryStoreInner {
    fn job(&self, job: &str) -> StoreResult<&BTreeMap<BuildNumber, BTreeMap<String, Vec<u8>>>> {
        if self.failing_jobs.contains(job) {
            return Err(StoreError::Transport(format!("injected failure for {job}")));
        }
        self.builds
            .get(job)
            .ok_or_else(|| StoreError::NotFound(format!("job {job}")))
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn list_builds(&self, job: &str) -> StoreResult<Vec<BuildNumber>> {
        self.read(|inner| -> StoreResult<Vec<BuildNumber>> {
            Ok(inner.job(job)?.keys().rev().copied().collect())
        })
    }

    async fn list_artifacts(
        &self,
        job: &str,
        build: BuildNumber,
        prefix: &str,
    ) -> StoreResult<Vec<String>> {
        self.read(|inner| -> StoreResult<Vec<String>> {
            let files = inner
                .job(job)?
                .get(&build)
                .ok_or_else(|| StoreError::NotFound(format!("build {job}/{build}")))?;
            let prefix = join_path(&[prefix.into()]);
            Ok(files
                .keys()
                .filter(|path| path.starts_with(&prefix))
                .cloned()
                .collect())
        })
    }

    async fn read_artifact(
        &self,
        job: &str,
        build: BuildNumber,
        path: &str,
    ) -> StoreResult<Vec<u8>> {
        self.read(|inner| -> StoreResult<Vec<u8>> {
            if inner.failing_paths.contains(path) || inner.failing_paths.contains(base_name(path)) {
                return Err(StoreError::Transport(format!("injected failure for {path}")));
            }
            inner
                .job(job)?
                .get(&build)
                .and_then(|files| files.get(path))
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("{job}/{build}/{path}")))
        })
    }
}
