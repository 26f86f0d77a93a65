use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;

use feedback_core::FeedbackId;
use feedback_triage::{FeedbackFilter, FeedbackPatch, Page};

use crate::app::dto::{self, FeedbackListQuery, FeedbackPage, JsonBody, UpdateFeedbackRequest};
use crate::app::errors::ApiError;
use crate::app::routes::comments;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_feedback))
        .route("/:id", get(get_feedback).patch(update_feedback).delete(delete_feedback))
        .route("/:id/comments", get(comments::list_comments).post(comments::create_comment))
        .route(
            "/:id/comments/:comment_id",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
}

pub(crate) fn feedback_id(raw: &str) -> Result<FeedbackId, ApiError> {
    dto::parse_id(raw, "Invalid feedback ID")
}

pub async fn list_feedback(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<FeedbackListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|_| ApiError::bad_request("Invalid query parameters"))?;

    let filter = FeedbackFilter {
        application_id: query.app_id()?,
        status: query.status()?,
        priority: query.priority()?,
        category_id: query.category_id()?,
    };
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref());

    let (feedback, total) = services.feedback.list_feedback(filter, page).await?;

    Ok(Json(FeedbackPage {
        feedback,
        total,
        page: page.page,
        limit: page.limit,
    })
    .into_response())
}

pub async fn get_feedback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = feedback_id(&id)?;
    let feedback = services
        .feedback
        .get_feedback(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Feedback not found"))?;
    Ok(Json(feedback).into_response())
}

pub async fn update_feedback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateFeedbackRequest>,
) -> Result<Response, ApiError> {
    let id = feedback_id(&id)?;
    let patch = FeedbackPatch::parse(body.status.as_deref(), body.priority.as_deref(), body.category_id)?;

    if let Some(category_id) = patch.category_id {
        let current = services
            .feedback
            .get_feedback(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Feedback not found"))?;
        services
            .applications
            .get_category(current.application_id, category_id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid category"))?;
    }

    let updated = services
        .feedback
        .update_feedback(id, &patch, Utc::now())
        .await
        .map_err(|e| ApiError::from_store(e, "Feedback not found"))?;

    tracing::info!(feedback_id = %updated.id, status = %updated.status, "feedback updated");
    Ok(dto::message("Feedback updated successfully").into_response())
}

pub async fn delete_feedback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = feedback_id(&id)?;
    services
        .feedback
        .delete_feedback(id)
        .await
        .map_err(|e| ApiError::from_store(e, "Feedback not found"))?;
    Ok(dto::message("Feedback deleted successfully").into_response())
}
