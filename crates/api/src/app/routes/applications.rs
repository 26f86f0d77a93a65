use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use feedback_applications::{ApiKey, ApplicationPatch, NewApplication};
use feedback_core::ApplicationId;
use feedback_infra::StoreError;

use crate::app::dto::{self, ApplicationView, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::categories;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route(
            "/:id",
            get(get_application).patch(update_application).delete(delete_application),
        )
        .route("/:id/regenerate-key", post(regenerate_key))
        .route(
            "/:id/categories",
            get(categories::list_categories).post(categories::create_category),
        )
}

pub(crate) fn application_id(raw: &str) -> Result<ApplicationId, ApiError> {
    dto::parse_id(raw, "Invalid application ID")
}

fn new_api_key() -> Result<ApiKey, ApiError> {
    ApiKey::generate().map_err(|e| ApiError::internal("api key generation failed", e))
}

pub async fn list_applications(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, ApiError> {
    let apps = services.applications.list_applications().await?;
    let views: Vec<ApplicationView> = apps.into_iter().map(ApplicationView::summary).collect();
    Ok(Json(views).into_response())
}

pub async fn create_application(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewApplication>,
) -> Result<Response, ApiError> {
    body.validate()?;

    let app = body.into_application(new_api_key()?, Utc::now())?;
    let app = services.applications.insert_application(app).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::conflict("Application with this slug already exists"),
        other => other.into(),
    })?;

    tracing::info!(application_id = %app.id, slug = %app.slug, "application created");
    Ok((StatusCode::CREATED, Json(ApplicationView::detail(app))).into_response())
}

pub async fn get_application(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = application_id(&id)?;
    let app = services
        .applications
        .get_application(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;
    Ok(Json(ApplicationView::detail(app)).into_response())
}

pub async fn update_application(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ApplicationPatch>,
) -> Result<Response, ApiError> {
    let id = application_id(&id)?;
    patch.validate()?;

    let app = services
        .applications
        .update_application(id, &patch, Utc::now())
        .await
        .map_err(|e| ApiError::from_store(e, "Application not found"))?;

    tracing::info!(application_id = %app.id, is_active = app.is_active, "application updated");
    Ok(dto::message("Application updated successfully").into_response())
}

/// Removes the application with its categories, feedback and comments.
pub async fn delete_application(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = application_id(&id)?;
    services
        .applications
        .delete_application(id)
        .await
        .map_err(|e| ApiError::from_store(e, "Application not found"))?;

    tracing::info!(application_id = %id, "application deleted");
    Ok(dto::message("Application deleted successfully").into_response())
}

/// The previous key stops resolving as soon as this returns.
pub async fn regenerate_key(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = application_id(&id)?;
    let key = new_api_key()?;

    services
        .applications
        .replace_api_key(id, &key, Utc::now())
        .await
        .map_err(|e| ApiError::from_store(e, "Application not found"))?;

    tracing::info!(application_id = %id, "api key rotated");
    Ok(Json(json!({
        "api_key": key.as_str(),
        "message": "API key regenerated successfully",
    }))
    .into_response())
}
