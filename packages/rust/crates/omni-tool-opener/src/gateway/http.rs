//! HTTP gateway: POST /api/open-tool → timed job → immediate acknowledgment.
//!
//! The acknowledgment never reports the job outcome. Callers poll
//! `GET /api/jobs/{job_id}` for the phase and error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::catalog::{CatalogEntry, ResourceCatalog};
use crate::driver::PlatformDriver;
use crate::error::StartError;
use crate::jobs::{JobMetricsSnapshot, JobSnapshot, LifecycleManager};

/// Acknowledgment text for accepted requests.
pub const OPEN_TOOL_STATUS: &str = "Process started to open tool";
const INVALID_TOOL: &str = "Invalid tool";
const INVALID_DURATION: &str = "Invalid duration";
const UNKNOWN_JOB: &str = "Unknown job";

/// Request body for POST /api/open-tool.
///
/// Fields are kept loose so a wrong type yields the same 400 as a missing value.
#[derive(Debug, Default, Deserialize)]
pub struct OpenToolRequest {
    /// Catalog name.
    #[serde(default)]
    pub tool: Option<Value>,
    /// Seconds to keep the tool open; integer or numeric string.
    #[serde(default)]
    pub duration: Option<Value>,
}

/// Acknowledgment body.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenToolResponse {
    pub status: String,
    pub tool: String,
    /// Effective duration in seconds.
    pub duration: u64,
    pub job_id: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, detail: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            detail,
        }),
    )
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct GatewayHealthResponse {
    pub status: &'static str,
    pub driver: String,
    pub driver_supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsupported_reason: Option<String>,
    pub jobs: JobMetricsSnapshot,
}

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<LifecycleManager>,
    pub catalog: Arc<ResourceCatalog>,
    pub driver: Arc<dyn PlatformDriver>,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        manager: Arc<LifecycleManager>,
        catalog: ResourceCatalog,
        driver: Arc<dyn PlatformDriver>,
    ) -> Self {
        Self {
            manager,
            catalog: Arc::new(catalog),
            driver,
        }
    }
}

/// Validated open-tool request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOpenTool {
    pub tool: String,
    pub location: String,
    pub duration: Duration,
}

/// Resolve the tool through the catalog and parse the duration.
///
/// Unknown or non-string `tool` → 400 `Invalid tool`; negative or non-numeric
/// `duration` → 400 `Invalid duration`. A missing duration takes `default_duration`.
pub fn validate_open_tool_request(
    body: &OpenToolRequest,
    catalog: &ResourceCatalog,
    default_duration: Duration,
) -> Result<ResolvedOpenTool, ApiError> {
    let tool = body
        .tool
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, INVALID_TOOL, None))?;
    let location = catalog
        .lookup(tool)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, INVALID_TOOL, None))?;

    let duration = match body.duration.as_ref() {
        None | Some(Value::Null) => default_duration,
        Some(value) => Duration::from_secs(parse_duration_secs(value).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                INVALID_DURATION,
                Some(format!("expected a non-negative integer, got {value}")),
            )
        })?),
    };

    Ok(ResolvedOpenTool {
        tool: tool.to_string(),
        location: location.to_string(),
        duration,
    })
}

fn parse_duration_secs(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    }
}

async fn handle_open_tool(
    State(state): State<GatewayState>,
    Json(body): Json<OpenToolRequest>,
) -> Result<Json<OpenToolResponse>, ApiError> {
    let resolved = validate_open_tool_request(
        &body,
        &state.catalog,
        state.manager.config().default_duration(),
    )?;
    let handle = state
        .manager
        .start_tool(&resolved.tool, &resolved.location, resolved.duration)
        .await
        .map_err(|error| match error {
            StartError::DurationExceeded { .. } => api_error(
                StatusCode::BAD_REQUEST,
                INVALID_DURATION,
                Some(error.to_string()),
            ),
            StartError::AtCapacity { .. } | StartError::Closed => api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                &error.to_string(),
                None,
            ),
        })?;

    Ok(Json(OpenToolResponse {
        status: OPEN_TOOL_STATUS.to_string(),
        tool: resolved.tool,
        duration: handle.duration().as_secs(),
        job_id: handle.job_id().to_string(),
    }))
}

async fn handle_job_status(
    State(state): State<GatewayState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .manager
        .get_status(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, UNKNOWN_JOB, None))
}

async fn handle_list_jobs(State(state): State<GatewayState>) -> Json<Vec<JobSnapshot>> {
    Json(state.manager.list().await)
}

async fn handle_list_tools(State(state): State<GatewayState>) -> Json<Vec<CatalogEntry>> {
    Json(state.catalog.entries())
}

async fn handle_health(State(state): State<GatewayState>) -> Json<GatewayHealthResponse> {
    let driver_supported = state.driver.is_supported();
    Json(GatewayHealthResponse {
        status: "healthy",
        driver: state.driver.name().to_string(),
        driver_supported,
        unsupported_reason: (!driver_supported).then(|| state.driver.unsupported_reason()),
        jobs: state.manager.metrics().await,
    })
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/open-tool", post(handle_open_tool))
        .route("/api/jobs", get(handle_list_jobs))
        .route("/api/jobs/{job_id}", get(handle_job_status))
        .route("/api/tools", get(handle_list_tools))
        .with_state(state)
}

/// Run the HTTP server; binds to `bind_addr` (e.g. `127.0.0.1:5005`).
/// Graceful shutdown on Ctrl+C (SIGINT) and SIGTERM (Unix). Jobs already
/// accepted keep running until the runtime exits.
pub async fn run_http(state: GatewayState, bind_addr: &str) -> Result<()> {
    let config = state.manager.config().clone();
    let app = router(state);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(
        "gateway listening on {} (max_in_flight={}, max_duration={}s, Ctrl+C/SIGTERM to stop)",
        bind_addr,
        config.max_in_flight,
        config.max_duration_secs
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!("failed to listen for SIGTERM: {error}; Ctrl+C only");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    }
}
