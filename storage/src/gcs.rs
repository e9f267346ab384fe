//! Google Cloud Storage store
//!
//! Reads CI logs published to a bucket through the GCS JSON API. Objects live
//! under `{logs_path}/{job}/{build}/...`; build numbers are the "directory"
//! prefixes directly below the job.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use perfdash_core::path::{join_path, PathSegment};
use perfdash_core::{ArtifactStore, BuildNumber, StoreError, StoreResult};

const USER_AGENT_VALUE: &str = concat!("perfdash/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Bucket location and client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsConfig {
    pub bucket: String,
    /// Object prefix under which job directories live, e.g. `logs`.
    pub logs_path: String,
    /// API root; overridden in tests.
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            bucket: "kubernetes-jenkins".to_string(),
            logs_path: "logs".to_string(),
            endpoint: DEFAULT_GCS_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

/// Anonymous read-only client for one bucket.
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: String,
    config: GcsConfig,
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

impl GcsStore {
    pub fn new(config: GcsConfig) -> StoreResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(transport)?;

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &GcsConfig {
        &self.config
    }

    fn objects_url(&self) -> StoreResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| StoreError::Transport(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.config.bucket.as_str(), "o"]);
        Ok(url)
    }

    fn build_prefix(&self, job: &str, build: BuildNumber) -> String {
        format!(
            "{}/",
            join_path(&[
                PathSegment::Text(&self.config.logs_path),
                PathSegment::Text(job),
                PathSegment::Number(build),
            ])
        )
    }

    /// Every object name and common prefix below `prefix`, across all pages.
    async fn list_all(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> StoreResult<(Vec<String>, Vec<String>)> {
        let base = self.objects_url()?;
        let mut prefixes = Vec::new();
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(delimiter) = delimiter {
                    query.append_pair("delimiter", delimiter);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            debug!("Listing gs://{}/{}", self.config.bucket, prefix);
            let response = self.client.get(url).send().await.map_err(transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(StoreError::InvalidResponse(format!(
                    "listing {prefix} returned {status}"
                )));
            }
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

            prefixes.extend(page.prefixes);
            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok((prefixes, names))
    }
}

#[async_trait]
impl ArtifactStore for GcsStore {
    async fn list_builds(&self, job: &str) -> StoreResult<Vec<BuildNumber>> {
        let job_prefix = format!(
            "{}/",
            join_path(&[
                PathSegment::Text(&self.config.logs_path),
                PathSegment::Text(job),
            ])
        );
        let (prefixes, names) = self.list_all(&job_prefix, Some("/")).await?;
        if prefixes.is_empty() && names.is_empty() {
            return Err(StoreError::NotFound(format!("job {job}")));
        }

        let mut builds: Vec<BuildNumber> = prefixes
            .iter()
            .filter_map(|p| {
                let build = p.strip_prefix(&job_prefix)?.trim_end_matches('/');
                match build.parse::<BuildNumber>() {
                    Ok(build) => Some(build),
                    Err(_) => {
                        debug!("Ignoring non-build prefix {}", p);
                        None
                    }
                }
            })
            .collect();
        builds.sort_unstable_by(|a, b| b.cmp(a));
        Ok(builds)
    }

    async fn list_artifacts(
        &self,
        job: &str,
        build: BuildNumber,
        prefix: &str,
    ) -> StoreResult<Vec<String>> {
        let build_prefix = self.build_prefix(job, build);
        let search = format!("{build_prefix}{}", join_path(&[PathSegment::Text(prefix)]));
        let (_, names) = self.list_all(&search, None).await?;

        let mut artifacts: Vec<String> = names
            .iter()
            .filter_map(|name| name.strip_prefix(&build_prefix))
            .filter(|name| !name.is_empty() && !name.ends_with('/'))
            .map(str::to_string)
            .collect();
        artifacts.sort();
        Ok(artifacts)
    }

    async fn read_artifact(
        &self,
        job: &str,
        build: BuildNumber,
        path: &str,
    ) -> StoreResult<Vec<u8>> {
        let object = format!(
            "{}{}",
            self.build_prefix(job, build),
            join_path(&[PathSegment::Text(path)])
        );
        let mut url = self.objects_url()?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("endpoint {} cannot be a base", self.endpoint)))?
            .push(&object);
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.client.get(url).send().await.map_err(transport)?;
        match response.status() {
            status if status.is_success() => {
                Ok(response.bytes().await.map_err(transport)?.to_vec())
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(object)),
            status => {
                warn!("Reading gs://{}/{} returned {}", self.config.bucket, object, status);
                Err(StoreError::InvalidResponse(format!(
                    "reading {object} returned {status}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str, logs_path: &str) -> GcsStore {
        GcsStore::new(GcsConfig {
            bucket: "bucket".to_string(),
            logs_path: logs_path.to_string(),
            endpoint: endpoint.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_objects_url() {
        let store = store("http://localhost:4443/", "logs");
        assert_eq!(
            store.objects_url().unwrap().as_str(),
            "http://localhost:4443/storage/v1/b/bucket/o"
        );
    }

    #[test]
    fn test_build_prefix_without_logs_path() {
        let store = store("http://localhost:4443", "");
        assert_eq!(store.build_prefix("ci-job", 12), "ci-job/12/");
    }

    #[test]
    fn test_default_config() {
        let config = GcsConfig::default();
        assert_eq!(config.endpoint, DEFAULT_GCS_ENDPOINT);
        assert_eq!(config.logs_path, "logs");
    }
}
