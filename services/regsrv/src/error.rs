//! Error handling for the Register Service

use axum::response::{IntoResponse, Response};
use errors::{ErrorCategory, ServiceErrorTrait};
use thiserror::Error;
use tracing::{event, Level};

use crate::core::classifier::DeviceFault;
use crate::core::dispatcher::DispatchError;
use crate::core::executor::TransactionFailure;
use crate::storage::StorageError;

/// Register Service error type
#[derive(Error, Debug)]
pub enum RegSrvError {
    /// Malformed request input (bad connection type, non-numeric fields, ...)
    #[error("{0}")]
    Validation(String),

    /// Operation-specific validation raised by the dispatcher
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Unknown log entry
    #[error("Log entry not found: {0}")]
    NotFound(i64),

    /// Connect phase exhausted its timer
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// DNS failure, refused or reset connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Classified failure of the register exchange
    #[error(transparent)]
    Device(#[from] DeviceFault),

    /// Log store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for the Register Service
pub type Result<T> = std::result::Result<T, RegSrvError>;

impl RegSrvError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<TransactionFailure> for RegSrvError {
    fn from(failure: TransactionFailure) -> Self {
        match failure {
            TransactionFailure::ConnectTimeout => Self::ConnectionTimeout,
            TransactionFailure::Socket(msg) => Self::Connection(msg),
            TransactionFailure::Device(fault) => Self::Device(fault),
        }
    }
}

impl From<figment::Error> for RegSrvError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl ServiceErrorTrait for RegSrvError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Dispatch(e) => e.error_code(),
            Self::NotFound(_) => "LOG_NOT_FOUND",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Device(fault) => fault.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::Dispatch(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::ConnectionTimeout => ErrorCategory::Timeout,
            Self::Connection(_) => ErrorCategory::Connection,
            // Exchange timeouts are device faults, not the connect timer
            Self::Device(_) => ErrorCategory::Protocol,
            Self::Storage(_) => ErrorCategory::Database,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl IntoResponse for RegSrvError {
    fn into_response(self) -> Response {
        match self.log_level() {
            Level::ERROR => event!(Level::ERROR, code = self.error_code(), "{}", self),
            Level::WARN => event!(Level::WARN, code = self.error_code(), "{}", self),
            _ => event!(Level::DEBUG, code = self.error_code(), "{}", self),
        }
        self.into_http_response()
    }
}
