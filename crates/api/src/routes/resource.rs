use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use record_lake_core::{ResourceService, SortOrder, StorageAdapter};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::{self, WriteGuard};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<SortOrder>,
}

/// CRUD routes for one resource, mounted at `{prefix}/{plural}`.
/// Writes pass through the write guard; reads are always open.
pub fn routes<S: StorageAdapter>(
    service: ResourceService<S>,
    guard: WriteGuard,
    prefix: &str,
) -> Router<AppState<S>> {
    let base = format!("{prefix}/{}", service.schema().plural);
    let guarded = middleware::from_fn_with_state(guard, auth::require_write_role);

    let mut router: Router<ResourceService<S>> = Router::new()
        .route(
            &base,
            get(list::<S>).merge(post(create::<S>).route_layer(guarded.clone())),
        )
        .route(
            &format!("{base}/{{id}}"),
            get(get_one::<S>).merge(
                put(update::<S>)
                    .merge(delete(remove::<S>))
                    .route_layer(guarded),
            ),
        );

    for spec in service.schema().unique_fields() {
        let field = spec.name;
        router = router.route(
            &format!("{base}/check-{field}"),
            get(
                move |State(service): State<ResourceService<S>>,
                      Query(params): Query<HashMap<String, String>>| async move {
                    let exists = service
                        .exists(field, params.get(field).map(String::as_str))
                        .await?;
                    Ok::<_, ApiError>(Json(json!({ "exists": exists })))
                },
            ),
        );
    }

    router.with_state(service)
}

async fn list<S: StorageAdapter>(
    State(service): State<ResourceService<S>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let records = service.list(query.sort.unwrap_or_default()).await?;
    let schema = service.schema();
    Ok(Json(Value::Array(
        records.iter().map(|record| schema.render(record)).collect(),
    )))
}

async fn get_one<S: StorageAdapter>(
    State(service): State<ResourceService<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = service.get(&id).await?;
    Ok(Json(service.schema().render(&record)))
}

async fn create<S: StorageAdapter>(
    State(service): State<ResourceService<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let record = service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(service.schema().render(&record))))
}

async fn update<S: StorageAdapter>(
    State(service): State<ResourceService<S>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let record = service.update(&id, &body).await?;
    Ok(Json(service.schema().render(&record)))
}

async fn remove<S: StorageAdapter>(
    State(service): State<ResourceService<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = service.delete(&id).await?;
    let schema = service.schema();

    let mut body = Map::new();
    body.insert(
        "message".to_string(),
        json!(format!("{} deleted successfully", schema.display_name)),
    );
    body.insert(schema.name.to_string(), schema.render(&record));
    Ok(Json(Value::Object(body)))
}
