use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use feedback_applications::NewCategory;
use feedback_infra::StoreError;

use crate::app::dto::JsonBody;
use crate::app::errors::ApiError;
use crate::app::routes::applications::application_id;
use crate::app::services::AppServices;

/// Unknown applications simply have no categories.
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Path(app_id): Path<String>,
) -> Result<Response, ApiError> {
    let app_id = application_id(&app_id)?;
    let categories = services.applications.list_categories(app_id).await?;
    Ok(Json(categories).into_response())
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(app_id): Path<String>,
    JsonBody(body): JsonBody<NewCategory>,
) -> Result<Response, ApiError> {
    let app_id = application_id(&app_id)?;
    let body = body.normalized()?;

    let category = services
        .applications
        .insert_category(app_id, body, Utc::now())
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("Application not found"),
            StoreError::Conflict(_) => ApiError::conflict("Category with this name already exists for this application"),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}
