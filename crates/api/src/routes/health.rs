use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use record_lake_core::StorageAdapter;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Health check routes.
pub fn routes<S: StorageAdapter>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health_check::<S>))
        .route("/ping", get(ping))
}

/// Reports storage reachability and the mounted resource count.
async fn health_check<S: StorageAdapter>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Value>> {
    state.storage().ping().await.map_err(|e| {
        crate::error::ApiError::Internal(format!("storage health check failed: {e}"))
    })?;

    Ok(Json(json!({
        "status": "ok",
        "storage": "connected",
        "backend": state.storage().backend(),
        "resources": state.resources().len(),
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// Liveness only; storage is not touched.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
