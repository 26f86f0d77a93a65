use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use feedback_auth::{SessionPrincipal, authorize};
use feedback_infra::{SyncError, TenantError, resolve_tenant, sync_user};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Bearer authentication followed by identity synchronization.
///
/// A storage failure during sync degrades to the token's claims with the
/// plain user role; a disabled account is refused.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = services.verifier.validate(token, Utc::now()).map_err(|e| {
        debug!(reason = %e, "rejecting bearer token");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let local = match sync_user(services.users.as_ref(), &claims, Utc::now()).await {
        Ok(user) => Some(user),
        Err(SyncError::AccountDisabled) => return Err(ApiError::forbidden("User account is inactive")),
        Err(SyncError::Storage(e)) => {
            warn!(user_id = %claims.subject, error = %e, "identity sync failed; continuing with token claims");
            None
        }
    };

    req.extensions_mut()
        .insert(SessionPrincipal::resolve(&claims, local.as_ref()));

    Ok(next.run(req).await)
}

/// Role policy check. Runs after `auth_middleware`.
pub async fn authorize_middleware(
    State(services): State<Arc<AppServices>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<SessionPrincipal>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    // Nested routers see a stripped URI; policy patterns use the full path.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if let Err(e) = authorize(&services.policy, principal.role, &path, req.method().as_str()) {
        debug!(user_id = %principal.user_id, error = %e, "request denied by policy");
        return Err(ApiError::forbidden("Forbidden"));
    }

    Ok(next.run(req).await)
}

/// API-key tenant gate for the public endpoints.
pub async fn app_auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = extract_api_key(req.headers(), req.uri());

    let application_id = resolve_tenant(services.applications.as_ref(), api_key.as_deref())
        .await
        .map_err(|e| match e {
            TenantError::MissingCredential => ApiError::unauthorized("Missing API key"),
            TenantError::UnknownKey => ApiError::unauthorized("Invalid API key"),
            TenantError::TenantDisabled => ApiError::forbidden("Application is inactive"),
            TenantError::Storage(e) => ApiError::internal("tenant lookup failed", e),
        })?;

    req.extensions_mut().insert(TenantContext::new(application_id));
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;

    let invalid = || ApiError::unauthorized("Invalid authorization header format");
    let header = header.to_str().map_err(|_| invalid())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(invalid)?.trim();
    if token.is_empty() {
        return Err(invalid());
    }

    Ok(token)
}

#[derive(Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// `X-API-Key` header first, then the `api_key` query parameter.
fn extract_api_key(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<ApiKeyQuery>::try_from_uri(uri)
            .ok()
            .and_then(|Query(q)| q.api_key)
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_requires_scheme_and_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer a.b.c"));
        assert_eq!(extract_bearer(&headers).unwrap(), "a.b.c");
    }

    #[test]
    fn api_key_header_wins_over_query() {
        let uri: Uri = "/api/v1/public/categories?api_key=from-query".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers, &uri).as_deref(), Some("from-query"));

        headers.insert("x-api-key", HeaderValue::from_static("from-header"));
        assert_eq!(extract_api_key(&headers, &uri).as_deref(), Some("from-header"));

        let bare: Uri = "/api/v1/public/categories".parse().unwrap();
        assert_eq!(extract_api_key(&HeaderMap::new(), &bare), None);
    }
}
