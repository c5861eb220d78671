//! Transaction log storage
//!
//! Every transaction attempt becomes one [`LogEntry`]. Stores are shared
//! across request tasks and must be safe for concurrent use.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use memory::MemoryLogStore;
pub use sqlite::SqliteLogStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persisted record of one transaction attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub host: String,
    pub port: u16,
    pub function_type: String,
    /// Zero-based register address
    pub start_address: i64,
    pub length: i64,
    pub write_data: Option<String>,
    pub response_data: Option<serde_json::Value>,
    pub is_success: bool,
    pub error_message: Option<String>,
    /// Elapsed milliseconds up to success or failure
    pub execution_time: i64,
    pub timestamp: DateTime<Utc>,
}

/// Fields of a log entry before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub host: String,
    pub port: u16,
    pub function_type: String,
    pub start_address: i64,
    pub length: i64,
    pub write_data: Option<String>,
    pub response_data: Option<serde_json::Value>,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub execution_time: i64,
    pub timestamp: DateTime<Utc>,
}

impl NewLogEntry {
    pub(crate) fn into_entry(self, id: i64) -> LogEntry {
        LogEntry {
            id,
            host: self.host,
            port: self.port,
            function_type: self.function_type,
            start_address: self.start_address,
            length: self.length,
            write_data: self.write_data,
            response_data: self.response_data,
            is_success: self.is_success,
            error_message: self.error_message,
            execution_time: self.execution_time,
            timestamp: self.timestamp,
        }
    }
}

/// Filters for listing log entries, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub host: Option<String>,
    pub function_type: Option<String>,
    pub is_success: Option<bool>,
    pub limit: usize,
}

impl LogQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    /// Hard ceiling regardless of the requested limit
    pub const MAX_LIMIT: usize = 100;

    /// Clamp a requested limit into `0..=MAX_LIMIT`
    pub fn clamp_limit(requested: i64) -> usize {
        requested.clamp(0, Self::MAX_LIMIT as i64) as usize
    }

    pub(crate) fn matches(&self, entry: &LogEntry) -> bool {
        self.host.as_deref().map_or(true, |h| entry.host == h)
            && self
                .function_type
                .as_deref()
                .map_or(true, |f| entry.function_type == f)
            && self.is_success.map_or(true, |s| entry.is_success == s)
    }
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            host: None,
            function_type: None,
            is_success: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Durable log of transaction attempts
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist a new entry and return it with its assigned id
    async fn insert(&self, entry: NewLogEntry) -> StorageResult<LogEntry>;

    async fn get(&self, id: i64) -> StorageResult<Option<LogEntry>>;

    /// Replace the stored response payload; `None` if the id is unknown
    async fn update_response(
        &self,
        id: i64,
        response: serde_json::Value,
    ) -> StorageResult<Option<LogEntry>>;

    /// Entries matching the query, ordered by timestamp then id, newest first
    async fn list(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>>;

    /// Cheap reachability check for health reporting
    async fn ping(&self) -> StorageResult<()>;

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}
