//! Local directory store
//!
//! Serves artifacts from a directory laid out like a CI log bucket:
//! `{root}/{job}/{build}/{artifacts_dir}/{file}`. Build directories whose
//! names are not numbers are ignored.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use perfdash_core::path::{join_path, PathSegment};
use perfdash_core::{ArtifactStore, BuildNumber, StoreError, StoreResult};

/// Store reading a directory tree on local disk.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn build_dir(&self, job: &str, build: BuildNumber) -> PathBuf {
        self.root
            .join(join_path(&[PathSegment::Text(job), PathSegment::Number(build)]))
    }
}

fn not_found_or_io(err: std::io::Error, what: String) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(what)
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn list_builds(&self, job: &str) -> StoreResult<Vec<BuildNumber>> {
        let job_dir = self.root.join(join_path(&[PathSegment::Text(job)]));
        let mut entries = tokio::fs::read_dir(&job_dir)
            .await
            .map_err(|e| not_found_or_io(e, format!("job {job}")))?;

        let mut builds = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().to_str().map(str::parse::<BuildNumber>) {
                Some(Ok(build)) => builds.push(build),
                _ => debug!("Ignoring non-build entry {:?} in {}", entry.file_name(), job),
            }
        }
        builds.sort_unstable_by(|a, b| b.cmp(a));
        Ok(builds)
    }

    async fn list_artifacts(
        &self,
        job: &str,
        build: BuildNumber,
        prefix: &str,
    ) -> StoreResult<Vec<String>> {
        let prefix = join_path(&[PathSegment::Text(prefix)]);
        let (dir, file_prefix) = match prefix.rsplit_once('/') {
            Some((dir, file_prefix)) => (dir.to_string(), file_prefix.to_string()),
            None => (String::new(), prefix.clone()),
        };

        let build_dir = self.build_dir(job, build);
        let search_dir = if dir.is_empty() {
            build_dir.clone()
        } else {
            build_dir.join(&dir)
        };

        let mut entries = match tokio::fs::read_dir(&search_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // A build without an artifacts directory simply has no artifacts.
                return match tokio::fs::metadata(&build_dir).await {
                    Ok(meta) if meta.is_dir() => Ok(Vec::new()),
                    _ => Err(not_found_or_io(e, format!("build {job}/{build}"))),
                };
            }
            Err(e) => return Err(not_found_or_io(e, format!("build {job}/{build}"))),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(&file_prefix) {
                artifacts.push(join_path(&[
                    PathSegment::Text(&dir),
                    PathSegment::Text(&name),
                ]));
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    async fn read_artifact(
        &self,
        job: &str,
        build: BuildNumber,
        path: &str,
    ) -> StoreResult<Vec<u8>> {
        let relative = join_path(&[PathSegment::Text(path)]);
        if relative.split('/').any(|part| part == "..") {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let file = self.build_dir(job, build).join(relative);
        tokio::fs::read(&file)
            .await
            .map_err(|e| not_found_or_io(e, format!("{job}/{build}/{path}")))
    }
}
