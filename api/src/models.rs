//! API Models Module
//!
//! Configuration and response bodies of the query API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const PARAM_JOB_NAME: &str = "jobname";
pub const PARAM_CATEGORY_NAME: &str = "metriccategoryname";
pub const PARAM_METRIC_NAME: &str = "metricname";

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Static dashboard assets served for any path the API does not handle
    pub www_dir: Option<PathBuf>,
    /// Reported by the health endpoint
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            www_dir: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ApiConfig {
    /// Parse an address such as `:8080`, `localhost:8080` or `[::1]:8080`.
    pub fn with_address(mut self, address: &str) -> anyhow::Result<Self> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("address {address:?} has no port"))?;
        self.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid port in {address:?}: {e}"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if !host.is_empty() {
            self.host = host.to_string();
        }
        Ok(self)
    }

    /// Resolve the bind address; the host may be an IP literal or a name.
    pub async fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| anyhow::anyhow!("cannot resolve host {:?}: {}", self.host, e))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("host {:?} resolved to no address", self.host))
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Refresh cycles published so far
    pub cycle: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub jobs: usize,
}
