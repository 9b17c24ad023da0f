use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use record_lake_core::ServiceError;
use serde_json::json;

/// API error type rendered as `{ "error": <message> }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    /// Request body refused by an extractor; keeps the extractor's status.
    #[error("rejected body ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Access denied. User not authenticated.".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            // conflicts share the 400 status of other rejected input
            ApiError::Service(err) => match err {
                ServiceError::InvalidInput(_)
                | ServiceError::MissingParameter(_)
                | ServiceError::Conflict(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                ServiceError::StorageUnavailable { message, source } => {
                    tracing::error!(error = %source, "{message}");
                    (StatusCode::INTERNAL_SERVER_ERROR, message)
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use record_lake_core::{StorageError, ValidationError};
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[tokio::test]
    async fn service_errors_map_to_taxonomy() {
        let (status, body) = render(
            ServiceError::InvalidInput(ValidationError::TooShort {
                field: "title".to_string(),
                min: 3,
            })
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "title length must be at least 3"}));

        let (status, body) = render(ServiceError::NotFound("Note").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Note not found"}));

        let (status, _) =
            render(ServiceError::Conflict("email already registered".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_failures_do_not_leak_detail() {
        let (status, body) = render(
            ServiceError::StorageUnavailable {
                message: "Failed to retrieve notes".to_string(),
                source: StorageError::Unavailable("password authentication failed".to_string()),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to retrieve notes"}));
    }

    #[tokio::test]
    async fn auth_errors() {
        let (status, body) = render(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied. User not authenticated.");

        let (status, _) = render(ApiError::Forbidden("nope".to_string())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rejected_bodies_keep_their_status() {
        let (status, body) = render(ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({"error": "length limit exceeded"}));

        let (status, body) = render(ApiError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}
