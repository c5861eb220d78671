//! Health Check Handler

use std::sync::Arc;

use axum::{extract::State, response::Json};
use chrono::Utc;
use common::{HealthStatus, ServiceStatus, SuccessResponse};
use tracing::warn;

use crate::api::routes::AppState;

/// Health check endpoint
///
/// Degraded when the log store cannot be reached; transactions still run
/// but their attempts are not recorded.
///
/// @route GET /health
/// @input State(state): AppState - Application state with log store
/// @output `Json<SuccessResponse<HealthStatus>>` - Health status
/// @status 200 - Health reported
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health reported", body = common::HealthStatus)
    ),
    tag = "regsrv"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<SuccessResponse<HealthStatus>> {
    let (status, storage) = match state.store.ping().await {
        Ok(()) if state.store.backend() == "memory" => (ServiceStatus::Healthy, "memory"),
        Ok(()) => (ServiceStatus::Healthy, "connected"),
        Err(e) => {
            warn!("Log store unreachable: {}", e);
            (ServiceStatus::Degraded, "unavailable")
        },
    };

    Json(SuccessResponse::new(HealthStatus {
        status,
        service: state.service_info.name.clone(),
        version: state.service_info.version.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        storage: storage.to_string(),
        timestamp: Utc::now(),
    }))
}
