//! Transaction Log API Handlers
//!
//! Listing and enrichment of logged transaction attempts.

#![allow(clippy::disallowed_methods)] // json! macro used in multiple functions

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use common::SuccessResponse;
#[allow(unused_imports)] // Used in #[utoipa::path] macro expansion
use serde_json::json;
use serde_json::Value;

use crate::api::dto::{EnrichRequest, LogListParams};
use crate::api::routes::AppState;
use crate::error::{RegSrvError, Result};
use crate::storage::LogEntry;

/// List logged transactions
///
/// Newest first. `limit` defaults to 50 and never exceeds 100.
///
/// @route GET /api/modbus
/// @input Query(params): LogListParams - limit, host, functionType, isSuccess
/// @output Json<SuccessResponse<Vec<LogEntry>>> - Matching entries
/// @status 200 - Success
/// @status 500 - Storage error
#[utoipa::path(
    get,
    path = "/api/modbus",
    params(LogListParams),
    responses(
        (status = 200, description = "Logged transactions, newest first", body = serde_json::Value,
            example = json!({
                "success": true,
                "data": [{
                    "id": 42,
                    "host": "10.0.0.5",
                    "port": 502,
                    "functionType": "writeMultipleRegisters",
                    "startAddress": 221,
                    "length": 2,
                    "writeData": "1000,0",
                    "responseData": {"valuesAsArray": [], "valuesAsBuffer": null},
                    "isSuccess": true,
                    "errorMessage": null,
                    "executionTime": 14,
                    "timestamp": "2025-01-01T08:00:00Z"
                }]
            })
        ),
        (status = 500, description = "Storage error")
    ),
    tag = "regsrv"
)]
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogListParams>,
) -> Result<Json<SuccessResponse<Vec<LogEntry>>>> {
    let entries = state.store.list(&params.into_query()).await?;
    Ok(Json(SuccessResponse::new(entries)))
}

/// Merge enrichment data into a logged response
///
/// Shallow merge: supplied keys replace stored ones, other stored keys
/// are kept. A stored payload that is not an object is replaced.
/// `enrichedData` itself must be an object.
///
/// @route PATCH /api/modbus/{id}
/// @input Path(id): i64 - Log entry id
/// @input Json(body): EnrichRequest - `enrichedData` object
/// @output Json<SuccessResponse<LogEntry>> - Updated entry
/// @status 200 - Success
/// @status 400 - Invalid id, malformed body or non-object enrichment data
/// @status 404 - Log entry not found
/// @side-effects Updates modbus_log.response_data
#[utoipa::path(
    patch,
    path = "/api/modbus/{id}",
    params(
        ("id" = i64, Path, description = "Log entry id")
    ),
    request_body = crate::api::dto::EnrichRequest,
    responses(
        (status = 200, description = "Entry enriched", body = serde_json::Value,
            example = json!({
                "success": true,
                "data": {
                    "id": 42,
                    "responseData": {
                        "valuesAsArray": [1234, 500],
                        "valuesAsBuffer": "04d201f4",
                        "parsed05V": [1.234, 0.5]
                    }
                }
            })
        ),
        (status = 400, description = "Invalid id, malformed body or enrichment data not an object"),
        (status = 404, description = "Log entry not found")
    ),
    tag = "regsrv"
)]
pub async fn enrich_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<SuccessResponse<LogEntry>>> {
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| RegSrvError::validation("Invalid log id"))?;

    let partial = EnrichRequest::from_json(body)?.into_partial()?;

    let entry = state.recorder.enrich(id, partial).await?;
    Ok(Json(SuccessResponse::new(entry)))
}
