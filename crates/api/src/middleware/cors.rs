use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer. Any origin unless one is pinned; a pinned origin
/// also allows credentials.
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let pinned = origin.and_then(|origin| match HeaderValue::from_str(origin) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(origin, "Ignoring unparseable CORS_ORIGIN");
            None
        }
    });

    match pinned {
        Some(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}
