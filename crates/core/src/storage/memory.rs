//! In-memory storage adapter.
//!
//! Collections live in a `HashMap` behind a tokio `RwLock`. Each row keeps an
//! insertion sequence number, so listing is stable even when two records share
//! a creation timestamp.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{SortOrder, StorageAdapter, StorageError};
use crate::record::{Record, RecordId};
use crate::schema::ValidFields;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

#[derive(Debug, Default)]
struct Collection {
    next_seq: u64,
    rows: HashMap<RecordId, Row>,
}

#[derive(Debug)]
struct Row {
    seq: u64,
    record: Record,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        let guard = self.collections.read().await;
        guard.get(collection).map_or(0, |c| c.rows.len())
    }
}

impl StorageAdapter for InMemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn find_all(
        &self,
        collection: &str,
        order: SortOrder,
    ) -> Result<Vec<Record>, StorageError> {
        let guard = self.collections.read().await;
        let Some(rows) = guard.get(collection).map(|c| &c.rows) else {
            return Ok(Vec::new());
        };

        let mut sorted: Vec<&Row> = rows.values().collect();
        sorted.sort_by_key(|row| (row.record.created_at, row.seq));
        if order == SortOrder::Desc {
            sorted.reverse();
        }
        Ok(sorted.into_iter().map(|row| row.record.clone()).collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> Result<Option<Record>, StorageError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|c| c.rows.get(&id))
            .map(|row| row.record.clone()))
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        exclude: Option<RecordId>,
    ) -> Result<Option<Record>, StorageError> {
        let guard = self.collections.read().await;
        let Some(c) = guard.get(collection) else {
            return Ok(None);
        };
        Ok(c
            .rows
            .values()
            .filter(|row| Some(row.record.id) != exclude)
            .filter(|row| row.record.field(field) == Some(value))
            .min_by_key(|row| row.seq)
            .map(|row| row.record.clone()))
    }

    async fn insert(&self, collection: &str, fields: ValidFields) -> Result<Record, StorageError> {
        let now = Utc::now();
        let record = Record {
            id: RecordId::generate(),
            fields: fields.into_map(),
            created_at: now,
            updated_at: now,
        };

        let mut guard = self.collections.write().await;
        let c = guard.entry(collection.to_string()).or_default();
        let seq = c.next_seq;
        c.next_seq += 1;
        c.rows.insert(
            record.id,
            Row {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn replace_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: ValidFields,
    ) -> Result<Option<Record>, StorageError> {
        let mut guard = self.collections.write().await;
        let Some(row) = guard.get_mut(collection).and_then(|c| c.rows.get_mut(&id)) else {
            return Ok(None);
        };
        row.record.fields = fields.into_map();
        row.record.updated_at = Utc::now().max(row.record.created_at);
        Ok(Some(row.record.clone()))
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> Result<Option<Record>, StorageError> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(collection)
            .and_then(|c| c.rows.remove(&id))
            .map(|row| row.record))
    }
}
