//! Transaction API Handler
//!
//! Executes one register transaction per request.

#![allow(clippy::disallowed_methods)] // json! macro used in multiple functions

use std::sync::Arc;

use axum::{extract::State, response::Json};
#[allow(unused_imports)] // Used in #[utoipa::path] macro expansion
use serde_json::json;
use serde_json::Value;
use tracing::warn;

use crate::api::dto::{TransactionRequestDto, TransactionResponse};
use crate::api::routes::AppState;
use crate::core::derive::{derive_values, DerivedKind};
use crate::core::recorder::response_payload;
use crate::core::request::{FunctionCode, TransactionRequest};
use crate::core::{ExecutionReport, TransactionExecutor};
use crate::error::{RegSrvError, Result};

/// Execute a register transaction
///
/// Connects to the device, performs the requested function, closes the
/// connection and logs the attempt. Input errors are rejected before any
/// connection is made and are not logged.
///
/// @route POST /api/modbus
/// @input Json(body): TransactionRequestDto - Target, function and register range
/// @output Json<TransactionResponse> - Register values, phase timings and log id
/// @status 200 - Transaction succeeded
/// @status 400 - Validation error
/// @status 500 - Socket or device error
/// @status 504 - Connection timeout
/// @side-effects Opens a TCP connection to the device; inserts into modbus_log
#[utoipa::path(
    post,
    path = "/api/modbus",
    request_body = crate::api::dto::TransactionRequestDto,
    responses(
        (status = 200, description = "Transaction succeeded", body = crate::api::dto::TransactionResponse,
            example = json!({
                "success": true,
                "data": {
                    "valuesAsArray": [100, 200, 300, 400],
                    "valuesAsBuffer": "006400c8012c0190"
                },
                "metrics": {"connectMs": 3, "transferMs": 12, "totalMs": 15},
                "logId": 42
            })
        ),
        (status = 400, description = "Validation error", body = serde_json::Value,
            example = json!({"success": false, "error": "Please provide 'start' and 'length' as numbers", "errorCode": "VALIDATION_ERROR"})
        ),
        (status = 500, description = "Socket or device error", body = serde_json::Value,
            example = json!({"success": false, "error": "Modbus exception: IllegalDataAddress", "errorCode": "MODBUS_EXCEPTION"})
        ),
        (status = 504, description = "Connection timeout", body = serde_json::Value,
            example = json!({"success": false, "error": "Connection timeout", "errorCode": "CONNECTION_TIMEOUT"})
        )
    ),
    tag = "regsrv"
)]
pub async fn execute_transaction(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<TransactionResponse>> {
    let (request, derive) =
        TransactionRequestDto::from_json(body)?.into_request(&state.device_defaults)?;

    // Own task: a client that hangs up must not abort a half-done exchange
    let executor = Arc::clone(&state.executor);
    let response = tokio::spawn(run_transaction(executor, request, derive))
        .await
        .map_err(|e| RegSrvError::internal(format!("Transaction task failed: {}", e)))??;

    Ok(Json(response))
}

async fn run_transaction(
    executor: Arc<TransactionExecutor>,
    request: TransactionRequest,
    derive: Vec<DerivedKind>,
) -> Result<TransactionResponse> {
    let ExecutionReport {
        outcome,
        metrics,
        log_entry,
    } = executor.execute(&request).await?;

    let registers = outcome.result?;
    let mut data = response_payload(&registers);
    let log_id = log_entry.map(|entry| entry.id);

    let is_read = request
        .function_type
        .parse::<FunctionCode>()
        .is_ok_and(|f| f.is_read());

    if is_read && !derive.is_empty() {
        let derived = derive_values(&registers.values, &derive);
        if let Value::Object(payload) = &mut data {
            payload.extend(derived.clone());
        }
        if let Some(id) = log_id {
            if let Err(e) = executor.recorder().enrich(id, derived).await {
                warn!("Failed to store derived values for log {}: {}", id, e);
            }
        }
    }

    Ok(TransactionResponse {
        success: true,
        data,
        metrics,
        log_id,
    })
}
