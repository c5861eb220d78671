//! Outcome Recorder
//!
//! Persists every transaction attempt and applies later enrichment.
//! Recording never fails the transaction: store errors are logged on the
//! operational channel and surface as a missing log id.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::error;

use super::executor::TransactionOutcome;
use super::request::{RegisterResponse, TransactionRequest};
use crate::error::{RegSrvError, Result};
use crate::storage::{LogEntry, LogStore, NewLogEntry};

/// Response payload as returned to callers and stored in the log
pub fn response_payload(response: &RegisterResponse) -> Value {
    json!({
        "valuesAsArray": response.values,
        "valuesAsBuffer": response.raw_hex(),
    })
}

/// Shallow merge: keys in `partial` win, other stored keys survive
///
/// A stored payload that is missing or not an object is replaced.
pub fn merge_response(existing: Option<Value>, partial: Map<String, Value>) -> Value {
    match existing {
        Some(Value::Object(mut base)) => {
            base.extend(partial);
            Value::Object(base)
        },
        _ => Value::Object(partial),
    }
}

/// Writes outcomes to the log store
#[derive(Clone)]
pub struct OutcomeRecorder {
    store: Arc<dyn LogStore>,
}

impl OutcomeRecorder {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Persist one attempt; `None` if the store rejected it
    pub async fn record(
        &self,
        request: &TransactionRequest,
        outcome: &TransactionOutcome,
    ) -> Option<LogEntry> {
        let (response_data, error_message) = match &outcome.result {
            Ok(response) => (Some(response_payload(response)), None),
            Err(failure) => (None, Some(failure.to_string())),
        };

        let entry = NewLogEntry {
            host: request.host.clone(),
            port: request.port,
            function_type: request.function_type.clone(),
            start_address: request.start_address,
            length: request.length,
            write_data: request.write_data.clone(),
            response_data,
            is_success: outcome.is_success(),
            error_message,
            execution_time: i64::try_from(outcome.elapsed_ms).unwrap_or(i64::MAX),
            timestamp: Utc::now(),
        };

        match self.store.insert(entry).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                error!(
                    "Failed to record {} transaction for {}:{}: {}",
                    request.function_type, request.host, request.port, e
                );
                None
            },
        }
    }

    /// Merge `partial` into the stored response of entry `id`
    pub async fn enrich(&self, id: i64, partial: Map<String, Value>) -> Result<LogEntry> {
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or(RegSrvError::NotFound(id))?;

        let merged = merge_response(existing.response_data, partial);

        self.store
            .update_response(id, merged)
            .await?
            .ok_or(RegSrvError::NotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::core::executor::TransactionFailure;
    use crate::storage::{LogQuery, MemoryLogStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use tracing_test::traced_test;

    /// Rejects every write
    struct FailingStore;

    #[async_trait]
    impl LogStore for FailingStore {
        async fn insert(&self, _entry: NewLogEntry) -> StorageResult<LogEntry> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        async fn get(&self, _id: i64) -> StorageResult<Option<LogEntry>> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        async fn update_response(&self, _id: i64, _response: Value) -> StorageResult<Option<LogEntry>> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        async fn list(&self, _query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> StorageResult<()> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    fn request() -> TransactionRequest {
        TransactionRequest {
            host: "10.0.0.5".into(),
            port: 502,
            unit_id: 1,
            function_type: "readHoldingRegisters".into(),
            start_address: 0,
            length: 2,
            write_data: None,
        }
    }

    fn success() -> TransactionOutcome {
        TransactionOutcome {
            elapsed_ms: 8,
            result: Ok(RegisterResponse::from_registers(vec![1, 2])),
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_merge_preserves_untouched_keys() {
        let merged = merge_response(Some(json!({"a": 1, "b": 2})), object(json!({"b": 3})));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_response(Some(json!({"a": 1})), object(json!({"a": 1})));
        let twice = merge_response(Some(once.clone()), object(json!({"a": 1})));
        assert_eq!(once, json!({"a": 1}));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_replaces_non_object_payloads() {
        assert_eq!(
            merge_response(Some(json!([1, 2])), object(json!({"a": 1}))),
            json!({"a": 1})
        );
        assert_eq!(merge_response(None, object(json!({"a": 1}))), json!({"a": 1}));
    }

    #[test]
    fn test_merge_never_drops_register_values() {
        let stored = json!({"valuesAsArray": [1, 2], "valuesAsBuffer": "00010002"});
        let merged = merge_response(Some(stored), object(json!({"parsed05V": [0.001, 0.002]})));
        assert_eq!(merged["valuesAsArray"], json!([1, 2]));
        assert_eq!(merged["valuesAsBuffer"], json!("00010002"));
        assert_eq!(merged["parsed05V"], json!([0.001, 0.002]));
    }

    #[tokio::test]
    async fn test_record_success_payload() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = OutcomeRecorder::new(store.clone());

        let entry = recorder.record(&request(), &success()).await.unwrap();
        assert!(entry.is_success);
        assert_eq!(entry.execution_time, 8);
        assert_eq!(entry.error_message, None);
        assert_eq!(
            entry.response_data,
            Some(json!({"valuesAsArray": [1, 2], "valuesAsBuffer": "00010002"}))
        );
    }

    #[tokio::test]
    async fn test_record_failure_message() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = OutcomeRecorder::new(store.clone());
        let outcome = TransactionOutcome {
            elapsed_ms: 10_001,
            result: Err(TransactionFailure::ConnectTimeout),
        };

        let entry = recorder.record(&request(), &outcome).await.unwrap();
        assert!(!entry.is_success);
        assert_eq!(entry.error_message.as_deref(), Some("Connection timeout"));
        assert_eq!(entry.response_data, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_record_swallows_store_errors() {
        let recorder = OutcomeRecorder::new(Arc::new(FailingStore));

        assert!(recorder.record(&request(), &success()).await.is_none());
        assert!(logs_contain("Failed to record readHoldingRegisters transaction"));
        assert!(logs_contain("disk full"));
    }

    #[tokio::test]
    async fn test_enrich_merges_into_stored_payload() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = OutcomeRecorder::new(store.clone());
        let entry = recorder.record(&request(), &success()).await.unwrap();

        let enriched = recorder
            .enrich(entry.id, object(json!({"parsed05V": [0.001, 0.002]})))
            .await
            .unwrap();
        let data = enriched.response_data.unwrap();
        assert_eq!(data["valuesAsArray"], json!([1, 2]));
        assert_eq!(data["parsed05V"], json!([0.001, 0.002]));
    }

    #[tokio::test]
    async fn test_enrich_unknown_id() {
        let recorder = OutcomeRecorder::new(Arc::new(MemoryLogStore::new()));
        let err = recorder.enrich(404, object(json!({"a": 1}))).await.unwrap_err();
        assert!(matches!(err, RegSrvError::NotFound(404)));
    }

    #[tokio::test]
    async fn test_enrich_storage_error_propagates() {
        let recorder = OutcomeRecorder::new(Arc::new(FailingStore));
        let err = recorder.enrich(1, object(json!({"a": 1}))).await.unwrap_err();
        assert!(matches!(err, RegSrvError::Storage(_)));
    }
}
