use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::id::RecordId;

/// A persisted resource record.
/// `id` and the timestamps are owned by the store; `fields` holds the
/// schema-validated editable attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// JSON object form: `id`, the editable fields, then `createdAt` / `updatedAt`.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::with_capacity(self.fields.len() + 3);
        out.insert("id".to_string(), Value::String(self.id.to_string()));
        for (key, value) in &self.fields {
            out.insert(key.clone(), value.clone());
        }
        out.insert("createdAt".to_string(), timestamp(self.created_at));
        out.insert("updatedAt".to_string(), timestamp(self.updated_at));
        out
    }
}

/// Render a timestamp the way every record field carries one.
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
