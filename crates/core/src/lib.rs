//! Core of the record lake: declared resource schemas, the record model,
//! storage adapters, and the generic resource service that ties them together.

pub mod record;
pub mod schema;
pub mod service;
pub mod storage;

pub use record::{Record, RecordId};
pub use schema::{ResourceSchema, ValidFields, ValidationError};
pub use service::{ResourceService, ServiceError};
pub use storage::{InMemoryStorage, PgStorage, SortOrder, StorageAdapter, StorageError};
