//! Wire-level request and response models
//!
//! Inbound fields are accepted loosely (numbers or numeric strings) and
//! normalized into [`TransactionRequest`] here, so handlers only see
//! validated core types.

#![allow(clippy::disallowed_methods)] // json! macro used in schema examples

use serde::{Deserialize, Serialize};
#[allow(unused_imports)] // Used in #[schema] macro expansion
use serde_json::json;
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::config::DeviceConfig;
use crate::core::derive::DerivedKind;
use crate::core::request::{FunctionCode, TransactionRequest};
use crate::core::TransactionMetrics;
use crate::error::{RegSrvError, Result};
use crate::storage::LogQuery;

/// Only transport the console supports
pub const TCP_CONNECTION: &str = "tcp";

/// Transaction request as posted by the console
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestDto {
    /// Must be "tcp" when present
    #[schema(example = "tcp")]
    pub connection_type: Option<String>,
    /// Device host, configured default when absent
    #[schema(example = "192.168.2.88")]
    pub host: Option<String>,
    /// Number or numeric string
    #[schema(value_type = Option<u16>, example = 502)]
    pub port: Option<Value>,
    #[schema(example = 1)]
    pub unit_id: Option<i64>,
    #[schema(example = "readHoldingRegisters")]
    pub function_type: Option<String>,
    /// One-based register address
    #[schema(value_type = Option<i64>, example = 1)]
    pub start: Option<Value>,
    /// Register count; the value to write for writeSingleRegister
    #[schema(value_type = Option<i64>, example = 4)]
    pub length: Option<Value>,
    /// Explicit value for writeSingleRegister, takes precedence over `length`
    #[schema(value_type = Option<i64>)]
    pub value: Option<Value>,
    /// Comma separated values for writeMultipleRegisters
    #[schema(example = "1000,0")]
    pub write_data: Option<String>,
    /// Derived views to compute after a successful read
    #[serde(default)]
    pub derive: Vec<DerivedKind>,
}

/// Integer from a JSON number or numeric string
fn numeric(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TransactionRequestDto {
    /// Decode a raw JSON body; shape errors become validation errors
    pub fn from_json(body: Value) -> Result<Self> {
        serde_json::from_value(body)
            .map_err(|e| RegSrvError::validation(format!("Invalid request body: {}", e)))
    }

    /// Normalize into a core request, filling target defaults
    pub fn into_request(
        self,
        defaults: &DeviceConfig,
    ) -> Result<(TransactionRequest, Vec<DerivedKind>)> {
        if let Some(kind) = self.connection_type.as_deref() {
            if kind != TCP_CONNECTION {
                return Err(RegSrvError::validation(
                    "Only 'tcp' connections are supported",
                ));
            }
        }

        let function_type = self.function_type.unwrap_or_default();
        let is_write_single =
            function_type.parse::<FunctionCode>().ok() == Some(FunctionCode::WriteSingleRegister);

        let start = numeric(self.start.as_ref());
        let length = if is_write_single && self.value.is_some() {
            numeric(self.value.as_ref())
        } else {
            numeric(self.length.as_ref())
        };
        let (Some(start), Some(length)) = (start, length) else {
            return Err(RegSrvError::validation(
                "Please provide 'start' and 'length' as numbers",
            ));
        };

        let host = self
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| defaults.default_host.clone());

        let port = match &self.port {
            None | Some(Value::Null) => defaults.default_port,
            Some(raw) => numeric(Some(raw))
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p != 0)
                .ok_or_else(|| RegSrvError::validation(format!("Invalid port: {}", raw)))?,
        };

        let unit_id = match self.unit_id {
            None => defaults.unit_id,
            Some(id) => u8::try_from(id).map_err(|_| {
                RegSrvError::validation(format!("unitId must be between 0 and 255, got {}", id))
            })?,
        };

        let request = TransactionRequest {
            host,
            port,
            unit_id,
            function_type,
            start_address: start.saturating_sub(1),
            length,
            write_data: self.write_data,
        };
        Ok((request, self.derive))
    }
}

/// Successful transaction response
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    /// `valuesAsArray`, `valuesAsBuffer` plus any derived views
    #[schema(value_type = Object, example = json!({
        "valuesAsArray": [16672, 0],
        "valuesAsBuffer": "41200000",
        "parsedFloatValues": [10.0]
    }))]
    pub data: Value,
    pub metrics: TransactionMetrics,
    /// Absent when the attempt could not be logged
    pub log_id: Option<i64>,
}

/// Query parameters for listing log entries
///
/// Kept as strings so malformed values fall back instead of rejecting.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LogListParams {
    /// Maximum entries, default 50, never more than 100
    pub limit: Option<String>,
    /// Exact host match
    pub host: Option<String>,
    /// Exact function name match
    pub function_type: Option<String>,
    /// "true" or "false"; other values are ignored
    pub is_success: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl LogListParams {
    pub fn into_query(self) -> LogQuery {
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map_or(LogQuery::DEFAULT_LIMIT, LogQuery::clamp_limit);

        let is_success = match self.is_success.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };

        LogQuery {
            host: non_empty(self.host),
            function_type: non_empty(self.function_type),
            is_success,
            limit,
        }
    }
}

/// Enrichment body for `PATCH /api/modbus/{id}`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    #[schema(value_type = Object, required = false, example = json!({"parsed05V": [1.234, 0.5]}))]
    pub enriched_data: Option<Value>,
}

impl EnrichRequest {
    pub fn from_json(body: Value) -> Result<Self> {
        serde_json::from_value(body)
            .map_err(|e| RegSrvError::validation(format!("Invalid request body: {}", e)))
    }

    /// Enrichment must be a non-null object; anything else would clobber
    /// the stored register values
    pub fn into_partial(self) -> Result<Map<String, Value>> {
        match self.enriched_data {
            None | Some(Value::Null) => Err(RegSrvError::validation(
                "No enrichment data provided",
            )),
            Some(Value::Object(partial)) => Ok(partial),
            Some(_) => Err(RegSrvError::validation(
                "'enrichedData' must be an object",
            )),
        }
    }
}
