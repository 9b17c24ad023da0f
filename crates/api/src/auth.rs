use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Claims carried by bearer tokens presented on write requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Role check for mutating resource routes.
/// With no roles configured every request passes.
#[derive(Clone)]
pub struct WriteGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    roles: Vec<String>,
    key: DecodingKey,
    validation: Validation,
}

impl WriteGuard {
    /// `roles` is a comma-separated list; any one of them grants write access.
    pub fn new(secret: &str, roles: Option<&str>) -> Self {
        let roles = roles
            .map(|list| {
                list.split(',')
                    .map(|role| role.trim().to_string())
                    .filter(|role| !role.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            inner: Arc::new(GuardInner {
                roles,
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
            }),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.roles.is_empty()
    }

    pub fn authorize(&self, headers: &HeaderMap) -> ApiResult<()> {
        if self.is_open() {
            return Ok(());
        }

        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = decode::<Claims>(token, &self.inner.key, &self.inner.validation)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                ApiError::Unauthorized
            })?
            .claims;

        if !self.inner.roles.iter().any(|role| *role == claims.role) {
            return Err(ApiError::Forbidden(format!(
                "Access denied. Required role: {}. Your role: {}",
                self.inner.roles.join(" or "),
                claims.role
            )));
        }
        tracing::debug!(sub = %claims.sub, role = %claims.role, "write authorized");
        Ok(())
    }
}

/// Middleware wrapper around [`WriteGuard::authorize`].
pub async fn require_write_role(
    State(guard): State<WriteGuard>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    guard.authorize(request.headers())?;
    Ok(next.run(request).await)
}
