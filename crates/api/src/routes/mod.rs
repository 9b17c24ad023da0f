pub mod health;
pub mod index;
pub mod resource;

use axum::Router;
use record_lake_core::StorageAdapter;

use crate::auth::WriteGuard;
use crate::error::ApiError;
use crate::middleware::body_limit::body_limit_layer;
use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router<S: StorageAdapter>(state: AppState<S>) -> Router {
    let config = state.config();
    let max_body_bytes = config.max_body_bytes;
    let guard = WriteGuard::new(&config.jwt_secret, config.write_role.as_deref());
    if !guard.is_open() {
        tracing::info!(roles = ?config.write_role, "Resource writes require a bearer token");
    }

    let mut router = Router::<AppState<S>>::new()
        .merge(health::routes::<S>())
        .merge(index::routes::<S>());
    for service in state.resources() {
        router = router.merge(resource::routes(
            service.clone(),
            guard.clone(),
            &config.api_prefix,
        ));
    }

    router
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(body_limit_layer(max_body_bytes))
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
