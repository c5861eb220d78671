//! In-memory log store
//!
//! Same semantics as the SQLite store; used by tests and `--ephemeral` runs.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{LogEntry, LogQuery, LogStore, NewLogEntry, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<LogEntry>,
    next_id: i64,
}

/// Log store backed by a vector behind a lock
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    inner: RwLock<Inner>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert(&self, entry: NewLogEntry) -> StorageResult<LogEntry> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let stored = entry.into_entry(inner.next_id);
        inner.entries.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StorageResult<Option<LogEntry>> {
        Ok(self
            .inner
            .read()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn update_response(
        &self,
        id: i64,
        response: serde_json::Value,
    ) -> StorageResult<Option<LogEntry>> {
        let mut inner = self.inner.write();
        Ok(inner.entries.iter_mut().find(|e| e.id == id).map(|e| {
            e.response_data = Some(response);
            e.clone()
        }))
    }

    async fn list(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let inner = self.inner.read();
        let mut matching: Vec<LogEntry> = inner
            .entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        matching.truncate(query.limit.min(LogQuery::MAX_LIMIT));
        Ok(matching)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
