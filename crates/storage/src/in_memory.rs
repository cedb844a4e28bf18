//! In-memory repository: useful for tests and single-process sessions.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use themeloom_core::{Filterable, RecordFilter, Repository, Result, StoredRecord};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Stores records in insertion order; `list` returns them newest first.
pub struct InMemoryRepository<T> {
    entries: Arc<RwLock<Vec<StoredRecord<T>>>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InMemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

#[async_trait]
impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Filterable + Clone + Send + Sync + 'static,
{
    async fn save(&self, record: T) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.entries.write().await.push(StoredRecord {
            id: id.clone(),
            created_at: Utc::now(),
            record,
        });
        debug!(id = %id, "Record saved");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecord<T>>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord<T>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| filter.matches(&e.record))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let len_before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() < len_before)
    }
}
