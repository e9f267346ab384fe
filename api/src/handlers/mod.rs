//! API Handlers Module
//!
//! Request handlers for the dashboard query endpoints. Every lookup answers
//! from the currently published snapshot; unknown names are empty results and
//! a missing parameter produces an empty response plus a warning.

use axum::{
    debug_handler,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use perfdash_core::QueryService;

use crate::models::{HealthResponse, PARAM_CATEGORY_NAME, PARAM_JOB_NAME, PARAM_METRIC_NAME};

/// Represents the state of the API server
pub struct ApiState {
    /// Lookups over the published tree
    pub query: QueryService,
    pub version: String,
}

/// Encode `value` as the JSON response body.
///
/// An encoding failure becomes a 500 with a small HTML error page.
pub fn serve_json<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            internal_error(&e)
        }
    }
}

fn internal_error(err: &dyn std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/html")],
        format!("<h3>Internal Error</h3><p>{err}"),
    )
        .into_response()
}

fn required<'a>(
    params: &'a HashMap<String, String>,
    name: &str,
    endpoint: &str,
) -> Option<&'a str> {
    let value = params.get(name).map(String::as_str);
    if value.is_none() {
        tracing::warn!("{}: url param {} is missing", endpoint, name);
    }
    value
}

fn empty() -> Response {
    StatusCode::OK.into_response()
}

/// Health check endpoint
#[debug_handler]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let snapshot = state.query.snapshot();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "perfdash".to_string(),
        version: state.version.clone(),
        cycle: snapshot.cycle,
        refreshed_at: snapshot.refreshed_at,
        jobs: snapshot.tree.job_names().len(),
    })
}

/// All job names
#[debug_handler]
pub async fn job_names(State(state): State<Arc<ApiState>>) -> Response {
    tracing::debug!("Listing job names");
    serve_json(&state.query.job_names())
}

/// Categories of `jobname`
#[debug_handler]
pub async fn category_names(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(job) = required(&params, PARAM_JOB_NAME, "metriccategorynames") else {
        return empty();
    };
    tracing::debug!("Listing categories of {}", job);
    serve_json(&state.query.category_names(job))
}

/// Metrics of `jobname` / `metriccategoryname`
#[debug_handler]
pub async fn metric_names(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (Some(job), Some(category)) = (
        required(&params, PARAM_JOB_NAME, "metricnames"),
        required(&params, PARAM_CATEGORY_NAME, "metricnames"),
    ) else {
        return empty();
    };
    tracing::debug!("Listing metrics of {}/{}", job, category);
    serve_json(&state.query.metric_names(job, category))
}

/// Build series of one metric
#[debug_handler]
pub async fn builds_data(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (Some(job), Some(category), Some(metric)) = (
        required(&params, PARAM_JOB_NAME, "buildsdata"),
        required(&params, PARAM_CATEGORY_NAME, "buildsdata"),
        required(&params, PARAM_METRIC_NAME, "buildsdata"),
    ) else {
        return empty();
    };

    match state.query.build_series(job, category, metric) {
        Some(series) => serve_json(&series),
        None => {
            tracing::info!("No data for {}/{}/{}", job, category, metric);
            empty()
        }
    }
}
