//! Unified error capabilities for the register console services
//!
//! Each service keeps its own domain error enum and implements
//! [`ServiceErrorTrait`] to gain a common outward-facing interface:
//! stable error codes, a coarse category, HTTP status mapping and
//! a recommended log level.

use serde::{Deserialize, Serialize};

// ============================================================================
// ErrorBody - API error response type
// ============================================================================

/// Error envelope returned by every HTTP endpoint
///
/// Mirrors the success envelope: `success` is always `false` and `error`
/// carries the human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Success indicator (always false for errors)
    pub success: bool,
    /// Human-readable error message
    pub error: String,
    /// Stable machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ErrorBody {
    /// Create a new error body with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            error_code: None,
        }
    }

    /// Attach a stable error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

// ============================================================================
// Error categories
// ============================================================================

/// Error category enum - used for classification and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    // Infrastructure layer
    Configuration,
    Database,
    Timeout,

    // Business logic layer
    Validation,
    NotFound,

    // Device communication layer
    Connection,
    Protocol,

    // System level
    Internal,
    Unknown,
}

// ============================================================================
// Service error trait - architectural layer
// ============================================================================

/// Error capability trait shared by all services
///
/// Implementors only need `error_code` and `category`; status codes and
/// log levels are derived from the category and may be overridden where a
/// service needs finer control (e.g. connect timeouts mapping to 504).
pub trait ServiceErrorTrait: std::error::Error + Send + Sync + 'static {
    /// Get error code (for API, logs, monitoring)
    fn error_code(&self) -> &'static str;

    /// Get error category (for classification)
    fn category(&self) -> ErrorCategory;

    /// Whether the caller may reasonably retry the same request
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Timeout | ErrorCategory::Connection
        )
    }

    /// HTTP status code as a plain number
    fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Timeout => 504,
            _ => 500,
        }
    }

    /// Convert to HTTP status code
    #[cfg(feature = "axum-support")]
    fn http_status(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Standard error body for this error
    fn to_error_body(&self) -> ErrorBody {
        ErrorBody::new(self.to_string()).with_code(self.error_code())
    }

    /// Convert into an Axum HTTP response
    #[cfg(feature = "axum-support")]
    fn into_http_response(self) -> axum::response::Response
    where
        Self: Sized,
    {
        use axum::response::{IntoResponse, Json};

        (self.http_status(), Json(self.to_error_body())).into_response()
    }

    /// Get log level
    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Database | ErrorCategory::Configuration => {
                Level::ERROR
            },
            ErrorCategory::Timeout | ErrorCategory::Connection | ErrorCategory::Protocol => {
                Level::WARN
            },
            ErrorCategory::Validation | ErrorCategory::NotFound => Level::INFO,
            ErrorCategory::Unknown => Level::WARN,
        }
    }
}
