use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::context::SessionPrincipal;

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Tokens are issued by the external identity provider.
pub async fn refresh() -> ApiError {
    ApiError::NotImplemented("Refresh token endpoint not implemented".to_string())
}

/// Stateless tokens: nothing to revoke server-side.
pub async fn logout() -> Response {
    dto::message("Logged out successfully").into_response()
}

pub async fn me(Extension(principal): Extension<SessionPrincipal>) -> Response {
    Json(json!({
        "user_id": principal.user_id,
        "email": principal.email,
        "name": principal.name,
        "role": principal.role,
    }))
    .into_response()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
