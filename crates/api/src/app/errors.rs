use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{debug, error};

use feedback_core::DomainError;
use feedback_infra::StoreError;

/// Every failure leaves the service as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    NotImplemented(String),
    /// Details are logged, never returned.
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Log `err` and return the opaque 500.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{context}");
        Self::Internal
    }

    /// Map a store failure, naming the missing resource on `NotFound`.
    pub fn from_store(err: StoreError, missing: &str) -> Self {
        match err {
            StoreError::NotFound => Self::not_found(missing),
            other => other.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::NotImplemented(m) => m,
            Self::Internal => "Internal server error".to_string(),
        };
        json_error(status, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::InvalidId(msg) => Self::BadRequest(msg),
            DomainError::NotFound => Self::not_found("Not found"),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("Not found"),
            StoreError::Conflict(constraint) => {
                debug!(%constraint, "unique constraint violated");
                Self::conflict("Conflict")
            }
            StoreError::Storage(_) => Self::internal("storage operation failed", err),
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_becomes_bad_request_with_its_message() {
        let err: ApiError = DomainError::validation("Content is required").into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Content is required"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_are_opaque() {
        let err: ApiError = StoreError::Storage("password authentication failed".into()).into();
        assert!(matches!(err, ApiError::Internal));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflicts_do_not_name_constraints() {
        let err: ApiError = StoreError::Conflict("applications_api_key_key".into()).into();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Conflict"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_resources_are_named() {
        let err = ApiError::from_store(StoreError::NotFound, "Feedback not found");
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Feedback not found"));
    }
}
