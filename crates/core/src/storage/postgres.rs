//! PostgreSQL storage adapter.
//!
//! All collections share the `records` table; editable fields are stored as
//! JSONB and the database assigns both timestamps. `seq` (BIGSERIAL) breaks
//! ties between records created in the same transaction instant.

use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::{SortOrder, StorageAdapter, StorageError};
use crate::record::{Record, RecordId};
use crate::schema::ValidFields;

const RETURNING: &str = "id, fields, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(format!("migration failed: {e}")))
    }
}

fn row_to_record(row: PgRow) -> Result<Record, StorageError> {
    let id: Uuid = row.try_get("id")?;
    let fields: Json<Value> = row.try_get("fields")?;
    let Value::Object(fields) = fields.0 else {
        return Err(StorageError::Corrupt {
            id: id.to_string(),
            reason: "fields column is not a JSON object".to_string(),
        });
    };
    Ok(Record {
        id: RecordId::from(id),
        fields,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Unique-index violations become `Duplicate`; everything else stays a
/// database error.
fn classify(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StorageError::Duplicate {
                constraint: db.constraint().unwrap_or("unique").to_string(),
            };
        }
    }
    StorageError::Database(err)
}

impl StorageAdapter for PgStorage {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_all(
        &self,
        collection: &str,
        order: SortOrder,
    ) -> Result<Vec<Record>, StorageError> {
        let direction = order.as_sql();
        let sql = format!(
            "SELECT {RETURNING} FROM records WHERE collection = $1 \
             ORDER BY created_at {direction}, seq {direction}"
        );
        let rows = sqlx::query(&sql)
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> Result<Option<Record>, StorageError> {
        let sql = format!("SELECT {RETURNING} FROM records WHERE collection = $1 AND id = $2");
        sqlx::query(&sql)
            .bind(collection)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_record)
            .transpose()
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        exclude: Option<RecordId>,
    ) -> Result<Option<Record>, StorageError> {
        let sql = format!(
            "SELECT {RETURNING} FROM records \
             WHERE collection = $1 AND fields -> $2 = $3 \
             AND ($4::uuid IS NULL OR id <> $4) \
             ORDER BY seq ASC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(field)
            .bind(Json(value))
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_record)
            .transpose()
    }

    async fn insert(&self, collection: &str, fields: ValidFields) -> Result<Record, StorageError> {
        let sql = format!(
            "INSERT INTO records (id, collection, fields) VALUES ($1, $2, $3) RETURNING {RETURNING}"
        );
        let fields: Map<String, Value> = fields.into_map();
        let row = sqlx::query(&sql)
            .bind(*RecordId::generate().as_uuid())
            .bind(collection)
            .bind(Json(fields))
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        row_to_record(row)
    }

    async fn replace_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: ValidFields,
    ) -> Result<Option<Record>, StorageError> {
        let sql = format!(
            "UPDATE records SET fields = $3, updated_at = GREATEST(now(), created_at) \
             WHERE collection = $1 AND id = $2 RETURNING {RETURNING}"
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(*id.as_uuid())
            .bind(Json(fields.into_map()))
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .map(row_to_record)
            .transpose()
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: RecordId,
    ) -> Result<Option<Record>, StorageError> {
        let sql = format!("DELETE FROM records WHERE collection = $1 AND id = $2 RETURNING {RETURNING}");
        sqlx::query(&sql)
            .bind(collection)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_record)
            .transpose()
    }
}
