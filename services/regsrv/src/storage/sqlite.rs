//! SQLite log store
//!
//! Table `modbus_log`, one row per transaction attempt. Timestamps are stored
//! as epoch milliseconds so ordering is numeric.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::sqlite::SqliteClient;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use super::{LogEntry, LogQuery, LogStore, NewLogEntry, StorageError, StorageResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS modbus_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host TEXT NOT NULL,
    port INTEGER NOT NULL,
    function_type TEXT NOT NULL,
    start_address INTEGER NOT NULL,
    length INTEGER NOT NULL,
    write_data TEXT,
    response_data TEXT,
    is_success BOOLEAN NOT NULL,
    error_message TEXT,
    execution_time INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
)
"#;

const INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_modbus_log_timestamp ON modbus_log (timestamp)";

const COLUMNS: &str = "id, host, port, function_type, start_address, length, write_data, \
     response_data, is_success, error_message, execution_time, timestamp";

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    host: String,
    port: i64,
    function_type: String,
    start_address: i64,
    length: i64,
    write_data: Option<String>,
    response_data: Option<String>,
    is_success: bool,
    error_message: Option<String>,
    execution_time: i64,
    timestamp: i64,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = StorageError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let response_data = row
            .response_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let port = u16::try_from(row.port)
            .map_err(|_| StorageError::Unavailable(format!("invalid port in row {}", row.id)))?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(row.timestamp).ok_or_else(|| {
            StorageError::Unavailable(format!("invalid timestamp in row {}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            host: row.host,
            port,
            function_type: row.function_type,
            start_address: row.start_address,
            length: row.length,
            write_data: row.write_data,
            response_data,
            is_success: row.is_success,
            error_message: row.error_message,
            execution_time: row.execution_time,
            timestamp,
        })
    }
}

/// Log store on a pooled SQLite database
#[derive(Clone)]
pub struct SqliteLogStore {
    client: SqliteClient,
}

impl SqliteLogStore {
    /// Wrap a client and create the schema if missing
    pub async fn new(client: SqliteClient) -> StorageResult<Self> {
        sqlx::query(SCHEMA).execute(client.pool()).await?;
        sqlx::query(INDEX).execute(client.pool()).await?;
        info!("Transaction log table ready at {}", client.path());
        Ok(Self { client })
    }

    /// Open (or create) the database file and ensure the schema
    pub async fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let client = SqliteClient::new(path)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Self::new(client).await
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn insert(&self, entry: NewLogEntry) -> StorageResult<LogEntry> {
        let response_text = entry
            .response_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO modbus_log (host, port, function_type, start_address, length, \
             write_data, response_data, is_success, error_message, execution_time, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.host)
        .bind(i64::from(entry.port))
        .bind(&entry.function_type)
        .bind(entry.start_address)
        .bind(entry.length)
        .bind(&entry.write_data)
        .bind(&response_text)
        .bind(entry.is_success)
        .bind(&entry.error_message)
        .bind(entry.execution_time)
        .bind(entry.timestamp.timestamp_millis())
        .execute(self.client.pool())
        .await?;

        // Millisecond storage; hand back what a later read would return
        let mut stored = entry.into_entry(result.last_insert_rowid());
        if let Some(ts) = DateTime::<Utc>::from_timestamp_millis(stored.timestamp.timestamp_millis())
        {
            stored.timestamp = ts;
        }
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StorageResult<Option<LogEntry>> {
        let row: Option<LogRow> =
            sqlx::query_as(&format!("SELECT {} FROM modbus_log WHERE id = ?", COLUMNS))
                .bind(id)
                .fetch_optional(self.client.pool())
                .await?;
        row.map(LogEntry::try_from).transpose()
    }

    async fn update_response(
        &self,
        id: i64,
        response: serde_json::Value,
    ) -> StorageResult<Option<LogEntry>> {
        let text = serde_json::to_string(&response)?;
        let result = sqlx::query("UPDATE modbus_log SET response_data = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(self.client.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn list(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM modbus_log WHERE 1 = 1", COLUMNS));

        if let Some(host) = &query.host {
            builder.push(" AND host = ").push_bind(host.clone());
        }
        if let Some(function_type) = &query.function_type {
            builder
                .push(" AND function_type = ")
                .push_bind(function_type.clone());
        }
        if let Some(is_success) = query.is_success {
            builder.push(" AND is_success = ").push_bind(is_success);
        }

        let limit = query.limit.min(LogQuery::MAX_LIMIT) as i64;
        builder
            .push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(limit);

        let rows: Vec<LogRow> = builder
            .build_query_as()
            .fetch_all(self.client.pool())
            .await?;
        rows.into_iter().map(LogEntry::try_from).collect()
    }

    async fn ping(&self) -> StorageResult<()> {
        self.client
            .ping()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    async fn store() -> SqliteLogStore {
        SqliteLogStore::new(SqliteClient::in_memory().await.unwrap())
            .await
            .unwrap()
    }

    fn entry(function_type: &str, success: bool, offset_ms: i64) -> NewLogEntry {
        NewLogEntry {
            host: "10.0.0.5".to_string(),
            port: 502,
            function_type: function_type.to_string(),
            start_address: 221,
            length: 2,
            write_data: Some("1000,0".to_string()),
            response_data: success.then(|| json!({"valuesAsArray": [], "valuesAsBuffer": null})),
            is_success: success,
            error_message: (!success).then(|| "Device offline: reset".to_string()),
            execution_time: 12,
            timestamp: Utc::now() + Duration::milliseconds(offset_ms),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let store = store().await;
        let inserted = store
            .insert(entry("writeMultipleRegisters", true, 0))
            .await
            .unwrap();

        let fetched = store.get(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.start_address, 221);
        assert_eq!(
            fetched.response_data,
            Some(json!({"valuesAsArray": [], "valuesAsBuffer": null}))
        );
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = store().await;
        assert!(store.get(99).await.unwrap().is_none());
        assert!(store.update_response(99, json!({})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = store().await;
        for i in 0..5 {
            store
                .insert(entry("readHoldingRegisters", i % 2 == 0, i * 10))
                .await
                .unwrap();
        }
        store
            .insert(entry("readInputRegisters", false, 100))
            .await
            .unwrap();

        let query = LogQuery {
            function_type: Some("readHoldingRegisters".into()),
            is_success: Some(false),
            ..LogQuery::default()
        };
        let rows = store.list(&query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 2]);
        assert!(rows.iter().all(|e| !e.is_success));
    }

    #[tokio::test]
    async fn test_list_limit_never_exceeds_ceiling() {
        let store = store().await;
        for i in 0..105 {
            store
                .insert(entry("readHoldingRegisters", false, i))
                .await
                .unwrap();
        }

        let query = LogQuery {
            limit: 500,
            ..LogQuery::default()
        };
        let rows = store.list(&query).await.unwrap();
        assert_eq!(rows.len(), 100);
        assert_eq!(rows[0].id, 105);
    }

    #[tokio::test]
    async fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("regsrv.db");

        let store = SqliteLogStore::open(&path).await.unwrap();
        store.insert(entry("readHoldingRegisters", true, 0)).await.unwrap();
        store.ping().await.unwrap();

        assert!(path.exists());
        assert_eq!(store.backend(), "sqlite");
    }
}
