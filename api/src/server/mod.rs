//! API Server Module
//!
//! This module contains the server setup for the dashboard query API.

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use perfdash_core::QueryService;

use crate::handlers::{
    builds_data, category_names, health_check, job_names, metric_names, ApiState,
};
use crate::models::ApiConfig;

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ApiConfig,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server answering from `query`
    pub fn new(config: ApiConfig, query: QueryService) -> Self {
        let state = Arc::new(ApiState {
            query,
            version: config.version.clone(),
        });

        Self { config, state }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Routes of the query API, with the static assets as fallback
    pub fn router(&self) -> Router {
        let app = Router::new()
            .route("/jobnames", get(job_names))
            .route("/metriccategorynames", get(category_names))
            .route("/metricnames", get(metric_names))
            .route("/buildsdata", get(builds_data))
            .route("/health", get(health_check))
            .with_state(self.state.clone());

        let app = match &self.config.www_dir {
            Some(dir) => {
                info!("Serving static assets from {}", dir.display());
                app.fallback_service(ServeDir::new(dir))
            }
            None => app,
        };

        app.layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` is cancelled
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.config.socket_addr().await?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        info!("Perfdash API server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| anyhow::anyhow!("API server failed: {}", e))?;

        info!("Perfdash API server stopped");
        Ok(())
    }
}
