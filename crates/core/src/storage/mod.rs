//! Storage adapters for resource records.
//!
//! The `StorageAdapter` trait is the only persistence surface the resource
//! service sees. Adapters own id and timestamp assignment; they do no schema
//! validation and accept writes only as `ValidFields`, so an unvalidated
//! candidate cannot reach a store.
//!
//! Every operation is scoped by a collection name (a resource's plural), and
//! each call is one atomic unit in the backing store: a single map write
//! under a lock for `InMemoryStorage`, a single SQL statement for `PgStorage`.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStorage;
pub use postgres::PgStorage;

use std::future::Future;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::record::{Record, RecordId};
use crate::schema::ValidFields;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A store-enforced uniqueness constraint rejected the write.
    #[error("duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Creation-time ordering for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Query strings go through `FromStr`, so `ASC` and `asc` are the same order.
impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Persistence operations over record collections.
///
/// Implementations must be cheap to clone; clones share the same store.
pub trait StorageAdapter: Clone + Send + Sync + 'static {
    /// Short backend label for health reporting.
    fn backend(&self) -> &'static str;

    /// Verify the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// All records of a collection ordered by creation time.
    /// Records created at the same instant keep insertion order.
    fn find_all(
        &self,
        collection: &str,
        order: SortOrder,
    ) -> impl Future<Output = Result<Vec<Record>, StorageError>> + Send;

    fn find_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> impl Future<Output = Result<Option<Record>, StorageError>> + Send;

    /// First record whose field `field` equals `value`, skipping `exclude`.
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        exclude: Option<RecordId>,
    ) -> impl Future<Output = Result<Option<Record>, StorageError>> + Send;

    /// Persist a new record, assigning its id and both timestamps.
    fn insert(
        &self,
        collection: &str,
        fields: ValidFields,
    ) -> impl Future<Output = Result<Record, StorageError>> + Send;

    /// Replace the editable fields of an existing record and bump
    /// `updated_at`. Returns `None` when the id is absent; never inserts.
    fn replace_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: ValidFields,
    ) -> impl Future<Output = Result<Option<Record>, StorageError>> + Send;

    /// Remove a record permanently, returning its last state.
    fn delete_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> impl Future<Output = Result<Option<Record>, StorageError>> + Send;
}
