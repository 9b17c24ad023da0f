use axum::{extract::State, routing::get, Json, Router};
use record_lake_core::StorageAdapter;
use serde_json::{json, Map, Value};

use crate::state::AppState;

pub fn routes<S: StorageAdapter>() -> Router<AppState<S>> {
    Router::new().route("/", get(index::<S>))
}

/// Welcome message with the endpoint map of every mounted resource.
async fn index<S: StorageAdapter>(State(state): State<AppState<S>>) -> Json<Value> {
    let prefix = &state.config().api_prefix;
    let mut endpoints = Map::new();
    for service in state.resources() {
        let schema = service.schema();
        let base = format!("{prefix}/{}", schema.plural);
        let mut ops = Map::new();
        ops.insert("list".into(), json!(format!("GET {base}")));
        ops.insert("get".into(), json!(format!("GET {base}/:id")));
        ops.insert("create".into(), json!(format!("POST {base}")));
        ops.insert("update".into(), json!(format!("PUT {base}/:id")));
        ops.insert("delete".into(), json!(format!("DELETE {base}/:id")));
        for spec in schema.unique_fields() {
            ops.insert(
                format!("check_{}", spec.name),
                json!(format!("GET {base}/check-{0}?{0}=", spec.name)),
            );
        }
        endpoints.insert(schema.plural.to_string(), Value::Object(ops));
    }

    Json(json!({
        "message": "Welcome to the Record Lake API",
        "endpoints": endpoints,
    }))
}
