//! Generic resource service: the five CRUD operations over one declared
//! resource, parametrized by storage adapter.
//!
//! Validation always runs before any storage call. Storage failures are
//! wrapped with an operation message that is safe to show to clients; the
//! underlying error stays available as the `source`.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::record::{Record, RecordId};
use crate::schema::{validate_candidate, ResourceSchema, ValidFields, ValidationError};
use crate::storage::{SortOrder, StorageAdapter, StorageError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("{0} parameter is required")]
    MissingParameter(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    StorageUnavailable {
        message: String,
        #[source]
        source: StorageError,
    },
}

/// CRUD operations for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceService<S> {
    schema: Arc<ResourceSchema>,
    storage: S,
}

impl<S: StorageAdapter> ResourceService<S> {
    pub fn new(schema: ResourceSchema, storage: S) -> Self {
        Self {
            schema: Arc::new(schema),
            storage,
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub async fn list(&self, order: SortOrder) -> Result<Vec<Record>, ServiceError> {
        self.storage
            .find_all(self.schema.collection(), order)
            .await
            .map_err(|e| self.storage_failure(format!("Failed to retrieve {}", self.schema.plural), e))
    }

    pub async fn get(&self, raw_id: &str) -> Result<Record, ServiceError> {
        let id = self.parse_id(raw_id)?;
        self.storage
            .find_by_id(self.schema.collection(), id)
            .await
            .map_err(|e| self.storage_failure(format!("Failed to retrieve {}", self.schema.name), e))?
            .ok_or(ServiceError::NotFound(self.schema.display_name))
    }

    pub async fn create(&self, candidate: &Value) -> Result<Record, ServiceError> {
        let fields = validate_candidate(&self.schema, candidate)?;
        let failed = || format!("Failed to create {}", self.schema.name);

        self.ensure_unique(&fields, None, failed).await?;

        let record = self
            .storage
            .insert(self.schema.collection(), fields)
            .await
            .map_err(|e| self.storage_failure(failed(), e))?;

        tracing::info!(resource = self.schema.name, id = %record.id, "record created");
        Ok(record)
    }

    /// Full replace of the editable fields. Never creates a missing record.
    /// A missing record is reported before any uniqueness conflict.
    pub async fn update(&self, raw_id: &str, candidate: &Value) -> Result<Record, ServiceError> {
        let fields = validate_candidate(&self.schema, candidate)?;
        let id = self.parse_id(raw_id)?;
        let failed = || format!("Failed to update {}", self.schema.name);

        if self.schema.unique_fields().next().is_some() {
            self.storage
                .find_by_id(self.schema.collection(), id)
                .await
                .map_err(|e| self.storage_failure(failed(), e))?
                .ok_or(ServiceError::NotFound(self.schema.display_name))?;
            self.ensure_unique(&fields, Some(id), failed).await?;
        }

        let record = self
            .storage
            .replace_by_id(self.schema.collection(), id, fields)
            .await
            .map_err(|e| self.storage_failure(failed(), e))?
            .ok_or(ServiceError::NotFound(self.schema.display_name))?;

        tracing::info!(resource = self.schema.name, id = %record.id, "record updated");
        Ok(record)
    }

    /// Permanently remove a record and return its last state.
    pub async fn delete(&self, raw_id: &str) -> Result<Record, ServiceError> {
        let id = self.parse_id(raw_id)?;
        let record = self
            .storage
            .delete_by_id(self.schema.collection(), id)
            .await
            .map_err(|e| self.storage_failure(format!("Failed to delete {}", self.schema.name), e))?
            .ok_or(ServiceError::NotFound(self.schema.display_name))?;

        tracing::info!(resource = self.schema.name, id = %record.id, "record deleted");
        Ok(record)
    }

    /// Whether any record holds `raw` in the unique field `field`.
    pub async fn exists(&self, field: &str, raw: Option<&str>) -> Result<bool, ServiceError> {
        let spec = self
            .schema
            .spec(field)
            .filter(|spec| spec.unique)
            .ok_or_else(|| ServiceError::NotFound(self.schema.display_name))?;
        let raw = raw
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingParameter(field.to_string()))?;

        let found = self
            .storage
            .find_by_field(
                self.schema.collection(),
                spec.name,
                &spec.normalize_lookup(raw),
                None,
            )
            .await
            .map_err(|e| self.storage_failure(format!("Failed to check {field}"), e))?;
        Ok(found.is_some())
    }

    fn parse_id(&self, raw_id: &str) -> Result<RecordId, ServiceError> {
        RecordId::parse(raw_id).ok_or(ServiceError::NotFound(self.schema.display_name))
    }

    /// Reject a write whose unique fields collide with another record.
    async fn ensure_unique(
        &self,
        fields: &ValidFields,
        exclude: Option<RecordId>,
        failed: impl Fn() -> String,
    ) -> Result<(), ServiceError> {
        for spec in self.schema.unique_fields() {
            let Some(value) = fields.get(spec.name) else {
                continue;
            };
            let clash = self
                .storage
                .find_by_field(self.schema.collection(), spec.name, value, exclude)
                .await
                .map_err(|e| self.storage_failure(failed(), e))?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(self.conflict_message(spec.name, exclude)));
            }
        }
        Ok(())
    }

    fn conflict_message(&self, field: &str, exclude: Option<RecordId>) -> String {
        match exclude {
            None => format!("{field} already registered"),
            Some(_) => format!("{field} already registered to another {}", self.schema.name),
        }
    }

    /// Map an adapter failure. A store-enforced uniqueness violation is a
    /// conflict, not an outage.
    fn storage_failure(&self, message: String, source: StorageError) -> ServiceError {
        if let StorageError::Duplicate { constraint } = &source {
            let field = self
                .schema
                .unique_fields()
                .find(|spec| constraint.contains(spec.name))
                .or_else(|| self.schema.unique_fields().next())
                .map_or("record", |spec| spec.name);
            return ServiceError::Conflict(format!("{field} already registered"));
        }
        ServiceError::StorageUnavailable { message, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    fn notes() -> (ResourceService<InMemoryStorage>, InMemoryStorage) {
        let storage = InMemoryStorage::new();
        (ResourceService::new(catalog::note(), storage.clone()), storage)
    }

    fn students() -> ResourceService<InMemoryStorage> {
        ResourceService::new(catalog::student(), InMemoryStorage::new())
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let (service, _) = notes();
        let created = service
            .create(&json!({"title": "groceries", "content": "milk"}))
            .await
            .unwrap();

        let fetched = service.get(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.field("title"), Some(&json!("groceries")));
        assert_eq!(fetched.field("content"), Some(&json!("milk")));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (service, _) = notes();
        let created = service
            .create(&json!({"title": "groceries", "content": "milk"}))
            .await
            .unwrap();
        let id = created.id.to_string();

        let deleted = service.delete(&id).await.unwrap();
        assert_eq!(deleted, created);

        assert!(matches!(service.get(&id).await, Err(ServiceError::NotFound("Note"))));
        assert!(matches!(service.delete(&id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_missing_id_never_upserts() {
        let (service, storage) = notes();
        let err = service
            .update(
                &RecordId::generate().to_string(),
                &json!({"title": "groceries", "content": "milk"}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Note not found");
        assert_eq!(storage.len("notes").await, 0);
    }

    #[tokio::test]
    async fn update_replaces_fields_but_keeps_identity() {
        let service = ResourceService::new(catalog::task(), InMemoryStorage::new());
        let created = service
            .create(&json!({"title": "ship it", "description": "soon", "status": "completed"}))
            .await
            .unwrap();

        let updated = service
            .update(&created.id.to_string(), &json!({"title": "ship it again"}))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.field("title"), Some(&json!("ship it again")));
        // full replace: absent optional fields drop out, defaults come back
        assert_eq!(updated.field("description"), None);
        assert_eq!(updated.field("status"), Some(&json!("pending")));
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let (service, storage) = notes();
        let err = service
            .create(&json!({"title": "ab", "content": "x"}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "title length must be at least 3");
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(service.list(SortOrder::Desc).await.unwrap().is_empty());
        assert_eq!(storage.len("notes").await, 0);
    }

    #[tokio::test]
    async fn invalid_update_leaves_record_untouched() {
        let (service, _) = notes();
        let created = service
            .create(&json!({"title": "groceries", "content": "milk"}))
            .await
            .unwrap();

        let err = service
            .update(&created.id.to_string(), &json!({"title": "", "content": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let fetched = service.get(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (service, _) = notes();
        for title in ["first", "second", "third"] {
            service
                .create(&json!({"title": title, "content": "x"}))
                .await
                .unwrap();
        }

        let titles: Vec<_> = service
            .list(SortOrder::Desc)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.fields["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("third"), json!("second"), json!("first")]);
    }

    #[tokio::test]
    async fn malformed_ids_are_not_found() {
        let (service, _) = notes();
        assert!(matches!(service.get("not-a-uuid").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete("42").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let service = students();
        let ada = service
            .create(&json!({"name": "Ada Lovelace", "email": "ada@example.com", "course": "Math"}))
            .await
            .unwrap();

        let err = service
            .create(&json!({"name": "Ada Again", "email": "ADA@example.com", "course": "Math"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "email already registered");

        let grace = service
            .create(&json!({"name": "Grace Hopper", "email": "grace@example.com", "course": "CS"}))
            .await
            .unwrap();
        let err = service
            .update(
                &grace.id.to_string(),
                &json!({"name": "Grace Hopper", "email": "ada@example.com", "course": "CS"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "email already registered to another student");

        // keeping one's own email is fine
        service
            .update(
                &ada.id.to_string(),
                &json!({"name": "Ada L.", "email": "ada@example.com", "course": "Math"}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found_even_with_taken_email() {
        let service = students();
        service
            .create(&json!({"name": "Ada Lovelace", "email": "ada@example.com", "course": "Math"}))
            .await
            .unwrap();

        let err = service
            .update(
                &RecordId::generate().to_string(),
                &json!({"name": "Ghost Writer", "email": "ada@example.com", "course": "Math"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Student")));
        assert_eq!(err.to_string(), "Student not found");
    }

    #[tokio::test]
    async fn exists_checks_unique_fields() {
        let service = students();
        service
            .create(&json!({"name": "Ada Lovelace", "email": "ada@example.com", "course": "Math"}))
            .await
            .unwrap();

        assert!(service.exists("email", Some(" Ada@Example.com")).await.unwrap());
        assert!(!service.exists("email", Some("bob@example.com")).await.unwrap());

        let err = service.exists("email", None).await.unwrap_err();
        assert_eq!(err.to_string(), "email parameter is required");
        assert!(matches!(
            service.exists("course", Some("Math")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_storage_errors_become_conflicts() {
        let service = students();
        let err = service.storage_failure(
            "Failed to create student".to_string(),
            StorageError::Duplicate {
                constraint: "records_students_email_key".to_string(),
            },
        );
        assert_eq!(err.to_string(), "email already registered");

        let err = service.storage_failure(
            "Failed to create student".to_string(),
            StorageError::Unavailable("connection refused".to_string()),
        );
        assert_eq!(err.to_string(), "Failed to create student");
    }
}
