//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, token verifier and policy shared by every request
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response shapes and extraction helpers
//! - `errors.rs`: the `{"error": ...}` response mapping

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

pub const API_PREFIX: &str = "/api/v1";

/// Build the full HTTP router.
///
/// Gates are attached with `route_layer` so unmatched paths reach the JSON
/// 404 fallback instead of an authentication error.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let public = routes::public::router()
        .route_layer(from_fn_with_state(services.clone(), middleware::app_auth_middleware));

    // Inner layer runs last: authenticate, then authorize.
    let authorized = routes::router()
        .route_layer(from_fn_with_state(services.clone(), middleware::authorize_middleware));

    let authenticated = Router::new()
        .route("/auth/me", get(routes::system::me))
        .merge(authorized)
        .route_layer(from_fn_with_state(services.clone(), middleware::auth_middleware));

    let api = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/refresh", post(routes::system::refresh))
        .route("/auth/logout", post(routes::system::logout))
        .nest("/public", public)
        .merge(authenticated);

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(routes::system::not_found)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
