//! Process wiring
//!
//! Loads the test descriptions, opens the artifact store, and runs the
//! refresh loop next to the API server until Ctrl-C.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use perfdash_api::ApiServer;
use perfdash_core::{
    load_test_descriptions, ArtifactStore, CollectStats, Downloader, QueryService, Refresher,
    TestDescription,
};
use perfdash_storage::open_store;

use crate::cli::settings::Settings;
use crate::cli::{Error, Result};

/// Test descriptions from the configured files and job directories.
pub fn load_descriptions(settings: &Settings) -> Result<Vec<TestDescription>> {
    if settings.config_paths.is_empty() && settings.job_config_dirs.is_empty() {
        return Err(Error::InvalidSettings(
            "no test descriptions configured: set config_paths or job_config_dirs".to_string(),
        ));
    }
    let descriptions = load_test_descriptions(&settings.config_paths, &settings.job_config_dirs)?;
    if descriptions.is_empty() {
        warn!("Configuration produced no test descriptions; the dashboard will be empty");
    } else {
        info!("Loaded {} test descriptions", descriptions.len());
    }
    Ok(descriptions)
}

/// Refresher reading from `store`, publishing into `query`.
pub fn build_refresher(
    settings: &Settings,
    store: Arc<dyn ArtifactStore>,
    descriptions: Vec<TestDescription>,
    query: QueryService,
) -> Refresher {
    let downloader = Downloader::new(store, settings.downloader_options());
    Refresher::new(downloader, descriptions, query)
}

fn log_stats(stats: &CollectStats) {
    info!(
        descriptions = stats.descriptions,
        builds = stats.builds_visited,
        merged = stats.artifacts_merged,
        fetch_errors = stats.fetch_errors,
        parse_errors = stats.parse_errors,
        failed_tasks = stats.failed_tasks,
        "Refresh statistics"
    );
}

/// Run one refresh cycle and return its statistics.
pub async fn run_once(settings: &Settings) -> Result<CollectStats> {
    let descriptions = load_descriptions(settings)?;
    let store = open_store(&settings.store_config())?;
    let refresher = build_refresher(settings, store, descriptions, QueryService::new());

    let (snapshot, stats) = refresher.refresh_once().await;
    info!(
        "Collected {} series across {} jobs",
        snapshot.tree.series_count(),
        snapshot.tree.job_names().len()
    );
    log_stats(&stats);
    Ok(stats)
}

/// Serve until Ctrl-C, refreshing every `refresh_period_secs`.
pub async fn run_server(settings: &Settings) -> Result<()> {
    let descriptions = load_descriptions(settings)?;
    let store = open_store(&settings.store_config())?;
    let query = QueryService::new();
    let refresher = build_refresher(settings, store, descriptions, query.clone());
    let server = ApiServer::new(settings.api_config()?, query);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal.cancel();
    });

    info!(
        "Refreshing every {}s from {:?} store",
        settings.refresh_period_secs, settings.mode
    );
    let refresh = tokio::spawn(refresher.run(settings.refresh_period(), shutdown.clone()));

    let served = server.start(shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = refresh.await {
        error!("Refresh loop panicked: {}", e);
    }
    served.map_err(Error::Server)
}
